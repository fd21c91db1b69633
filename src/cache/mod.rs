//! Single-flight fetch cache for disclosure files.
//!
//! [`SingleFlightCache::fetch_once`] guarantees at most one [`PageSource`]
//! call per distinct URL for the lifetime of the cache, however many callers
//! ask for it concurrently.
//!
//! # State machine
//!
//! Each URL moves `Queued -> Succeeded` or `Queued -> Failed(error)` exactly
//! once and is never reset:
//!
//! - The first caller claims the URL under the shared lock and becomes the
//!   **owner**. It fetches outside the lock, writes the body to its disk
//!   slot, then records the entry and publishes the new state.
//! - Later callers are **followers**. They subscribe to the URL's `watch`
//!   channel and suspend until the state leaves `Queued`; `watch` is
//!   level-triggered, so a follower that subscribes after completion still
//!   sees the final state.
//! - `Succeeded` is served from the disk slot, `Failed` returns the stored
//!   error. Neither triggers a new fetch.
//!
//! A follower cancelled while waiting returns [`FetchError::Cancelled`]
//! without touching the shared state. An owner that is cancelled or dropped
//! mid-fetch publishes `Failed(Cancelled)` so followers never hang.

mod disk;

pub use disk::{DiskSlots, SCRATCH_DIR_PREFIX};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::fetch::{FetchError, FetchedPage, PageSource};

/// Per-URL fetch state.
#[derive(Debug, Clone)]
pub enum FetchState {
    /// An owner is fetching.
    Queued,
    /// The body is on disk and the entry is recorded.
    Succeeded,
    /// The fetch failed; the error is served to every caller.
    Failed(FetchError),
}

impl FetchState {
    /// Returns true while the owner has not finished.
    #[must_use]
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued)
    }
}

/// Cached disclosure file handed back to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentCacheEntry {
    /// Whether the final URL used HTTPS.
    pub is_https: bool,
    /// `Content-Type` of the response, if any.
    pub content_type: Option<String>,
    /// Final URL after redirects.
    pub resolved_url: String,
    /// Response body.
    pub body: String,
}

/// In-memory part of an entry; the body lives in its disk slot.
#[derive(Debug, Clone)]
struct CachedPage {
    is_https: bool,
    content_type: Option<String>,
    resolved_url: String,
    slot: PathBuf,
}

#[derive(Debug, Default)]
struct Tables {
    states: HashMap<String, watch::Sender<FetchState>>,
    pages: HashMap<String, CachedPage>,
}

enum Role {
    Owner,
    Follower(watch::Receiver<FetchState>),
}

/// Fetch-deduplicating content cache.
///
/// Construct one per run and share it behind an `Arc`.
pub struct SingleFlightCache {
    source: Arc<dyn PageSource>,
    slots: DiskSlots,
    tables: Mutex<Tables>,
}

impl std::fmt::Debug for SingleFlightCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlightCache")
            .field("slot_dir", &self.slots.dir())
            .field("keys", &self.len())
            .finish_non_exhaustive()
    }
}

impl SingleFlightCache {
    /// Creates an empty cache fetching through `source` and storing bodies in `slots`.
    #[must_use]
    pub fn new(source: Arc<dyn PageSource>, slots: DiskSlots) -> Self {
        Self {
            source,
            slots,
            tables: Mutex::new(Tables::default()),
        }
    }

    /// Returns the current state for `url`, if it was ever requested.
    #[must_use]
    pub fn state(&self, url: &str) -> Option<FetchState> {
        self.lock()
            .states
            .get(url)
            .map(|tx| tx.borrow().clone())
    }

    /// Returns the directory holding the disk slots.
    #[must_use]
    pub fn slot_dir(&self) -> &Path {
        self.slots.dir()
    }

    /// Returns the number of URLs ever requested.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().states.len()
    }

    /// Returns true if no URL was requested yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetches `url` at most once per cache lifetime.
    ///
    /// # Errors
    ///
    /// Returns the owner's [`FetchError`] (cached for every caller),
    /// [`FetchError::Cancelled`] if `cancel` fires first, or
    /// [`FetchError::CacheIo`] if the disk slot cannot be written or read.
    #[instrument(skip(self, cancel), fields(url = %url))]
    pub async fn fetch_once(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<ContentCacheEntry, FetchError> {
        match self.claim(url) {
            Role::Owner => {
                debug!("claimed as owner");
                self.fetch_as_owner(url, cancel).await
            }
            Role::Follower(rx) => {
                debug!("joining in-flight or finished fetch");
                self.wait_as_follower(url, rx, cancel).await
            }
        }
    }

    /// Check-and-claim in a single critical section.
    fn claim(&self, url: &str) -> Role {
        let mut tables = self.lock();
        if let Some(tx) = tables.states.get(url) {
            return Role::Follower(tx.subscribe());
        }
        let (tx, _rx) = watch::channel(FetchState::Queued);
        tables.states.insert(url.to_string(), tx);
        Role::Owner
    }

    async fn fetch_as_owner(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<ContentCacheEntry, FetchError> {
        let mut guard = OwnerGuard {
            cache: self,
            url,
            armed: true,
        };

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(FetchError::cancelled(url)),
            result = self.source.fetch_page(url) => result,
        };

        let result = match outcome {
            Ok(page) => self.store_page(url, page).await,
            Err(err) => Err(err),
        };

        match &result {
            Ok(_) => debug!("owner committed success"),
            Err(err) => {
                debug!(error = %err, "owner committed failure");
                self.commit_failure(url, err.clone());
            }
        }
        guard.armed = false;
        result
    }

    /// Writes the slot, then records the entry and flips the state.
    async fn store_page(&self, url: &str, page: FetchedPage) -> Result<ContentCacheEntry, FetchError> {
        let slot = self
            .slots
            .write(url, &page.body)
            .await
            .map_err(|e| FetchError::cache_io(url, &e))?;

        let FetchedPage {
            is_https,
            content_type,
            final_url,
            body,
        } = page;

        {
            let mut tables = self.lock();
            tables.pages.insert(
                url.to_string(),
                CachedPage {
                    is_https,
                    content_type: content_type.clone(),
                    resolved_url: final_url.clone(),
                    slot,
                },
            );
            if let Some(tx) = tables.states.get(url) {
                tx.send_replace(FetchState::Succeeded);
            }
        }

        Ok(ContentCacheEntry {
            is_https,
            content_type,
            resolved_url: final_url,
            body,
        })
    }

    /// Flips a still-queued key to `Failed`. Returns true if this call did it.
    fn commit_failure(&self, url: &str, err: FetchError) -> bool {
        let tables = self.lock();
        let Some(tx) = tables.states.get(url) else {
            return false;
        };
        let queued = tx.borrow().is_queued();
        if queued {
            tx.send_replace(FetchState::Failed(err));
        }
        queued
    }

    async fn wait_as_follower(
        &self,
        url: &str,
        mut rx: watch::Receiver<FetchState>,
        cancel: &CancellationToken,
    ) -> Result<ContentCacheEntry, FetchError> {
        loop {
            let state = rx.borrow_and_update().clone();
            match state {
                FetchState::Succeeded => return self.read_entry(url).await,
                FetchState::Failed(err) => return Err(err),
                FetchState::Queued => {}
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("follower cancelled while waiting");
                    return Err(FetchError::cancelled(url));
                }
                changed = rx.changed() => {
                    if changed.is_err() {
                        return Err(FetchError::cancelled(url));
                    }
                }
            }
        }
    }

    async fn read_entry(&self, url: &str) -> Result<ContentCacheEntry, FetchError> {
        let cached = self.lock().pages.get(url).cloned();
        let Some(cached) = cached else {
            return Err(FetchError::CacheIo {
                url: url.to_string(),
                message: "entry missing for succeeded key".to_string(),
            });
        };
        let body = self
            .slots
            .read(&cached.slot)
            .await
            .map_err(|e| FetchError::cache_io(url, &e))?;
        Ok(ContentCacheEntry {
            is_https: cached.is_https,
            content_type: cached.content_type,
            resolved_url: cached.resolved_url,
            body,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Publishes `Failed(Cancelled)` if the owner's future is dropped before
/// committing, and removes any slot it already renamed into place.
struct OwnerGuard<'a> {
    cache: &'a SingleFlightCache,
    url: &'a str,
    armed: bool,
}

impl Drop for OwnerGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!(url = self.url, "owner dropped mid-fetch; marking key cancelled");
            let failed = self
                .cache
                .commit_failure(self.url, FetchError::cancelled(self.url));
            if failed && let Err(e) = self.cache.slots.discard(self.url) {
                warn!(url = self.url, error = %e, "failed to remove orphaned cache slot");
            }
        }
    }
}
