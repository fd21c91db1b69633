//! Metadata sync: resolve app targets and remember them in the store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::EngineError;
use crate::metadata::{AppMetadata, MetadataError, MetadataResolver};
use crate::store::{AppRecord, MetadataStore};
use crate::target::{TargetDescriptor, classify};

/// Default worker count for the sync workflow.
pub const DEFAULT_SYNC_CONCURRENCY: usize = 4;

/// Knobs for one sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Re-fetch apps that are already stored.
    pub force: bool,
    /// Only fetch apps that are not stored yet; wins over `force`.
    pub only_new_apps: bool,
    /// Worker count (1..=100).
    pub concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            force: false,
            only_new_apps: false,
            concurrency: DEFAULT_SYNC_CONCURRENCY,
        }
    }
}

impl SyncOptions {
    /// Decides whether an app must be looked up given its stored record.
    #[must_use]
    pub fn should_fetch(&self, existing: Option<&AppRecord>) -> bool {
        let Some(record) = existing else {
            return true;
        };
        if self.only_new_apps {
            return false;
        }
        record.needs_recheck() || self.force
    }
}

/// What happened to one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Not an app, or already stored.
    Skipped,
    /// Resolved and stored.
    Stored,
    /// Store reports the app missing; stored with notes.
    StoredNotFound,
    /// Resolution or storage failed; nothing written.
    Failed,
    /// The run was cancelled before the lookup finished; nothing written.
    Cancelled,
}

/// Counters for a sync run.
#[derive(Debug, Default)]
pub struct SyncStats {
    skipped: AtomicUsize,
    stored: AtomicUsize,
    not_found: AtomicUsize,
    failed: AtomicUsize,
    cancelled: AtomicUsize,
}

impl SyncStats {
    /// Targets skipped.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Apps resolved and stored.
    #[must_use]
    pub fn stored(&self) -> usize {
        self.stored.load(Ordering::SeqCst)
    }

    /// Apps stored with a not-found note.
    #[must_use]
    pub fn not_found(&self) -> usize {
        self.not_found.load(Ordering::SeqCst)
    }

    /// Apps that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Lookups abandoned because the run was cancelled.
    #[must_use]
    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn record(&self, outcome: SyncOutcome) {
        let counter = match outcome {
            SyncOutcome::Skipped => &self.skipped,
            SyncOutcome::Stored => &self.stored,
            SyncOutcome::StoredNotFound => &self.not_found,
            SyncOutcome::Failed => &self.failed,
            SyncOutcome::Cancelled => &self.cancelled,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

/// Resolves app targets and persists their metadata.
pub struct AppSync {
    resolver: Arc<MetadataResolver>,
    store: Arc<dyn MetadataStore>,
    options: SyncOptions,
}

impl std::fmt::Debug for AppSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppSync")
            .field("resolver", &self.resolver)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl AppSync {
    /// Creates a sync workflow.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the worker count is outside 1..=100.
    pub fn new(
        resolver: Arc<MetadataResolver>,
        store: Arc<dyn MetadataStore>,
        options: SyncOptions,
    ) -> Result<Self, EngineError> {
        if !(1..=100).contains(&options.concurrency) {
            return Err(EngineError::InvalidConcurrency {
                value: options.concurrency,
            });
        }
        Ok(Self {
            resolver,
            store,
            options,
        })
    }

    /// Syncs every app target in `lines`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SemaphoreClosed`] if the pool semaphore is closed.
    #[instrument(skip(self, lines, cancel), fields(lines = lines.len()))]
    pub async fn run(
        &self,
        lines: &[String],
        cancel: &CancellationToken,
    ) -> Result<SyncStats, EngineError> {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency));
        let stats = Arc::new(SyncStats::default());
        let mut handles = Vec::new();

        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let target = classify(line);
            if !target.is_app() {
                info!(target = line, "not an app target, skipping");
                stats.record(SyncOutcome::Skipped);
                continue;
            }
            if cancel.is_cancelled() {
                break;
            }

            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|_| EngineError::SemaphoreClosed)?;
            let resolver = Arc::clone(&self.resolver);
            let store = Arc::clone(&self.store);
            let stats = Arc::clone(&stats);
            let options = self.options;
            let cancel = cancel.clone();

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let outcome =
                    sync_one(&target, resolver.as_ref(), store.as_ref(), options, &cancel).await;
                stats.record(outcome);
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "sync task panicked");
                stats.record(SyncOutcome::Failed);
            }
        }

        info!(
            stored = stats.stored(),
            not_found = stats.not_found(),
            skipped = stats.skipped(),
            failed = stats.failed(),
            cancelled = stats.cancelled(),
            "sync complete"
        );

        Ok(Arc::try_unwrap(stats).unwrap_or_else(|shared| {
            let copy = SyncStats::default();
            copy.skipped.store(shared.skipped(), Ordering::SeqCst);
            copy.stored.store(shared.stored(), Ordering::SeqCst);
            copy.not_found.store(shared.not_found(), Ordering::SeqCst);
            copy.failed.store(shared.failed(), Ordering::SeqCst);
            copy.cancelled.store(shared.cancelled(), Ordering::SeqCst);
            copy
        }))
    }
}

/// Syncs one app target. A cancelled lookup is abandoned without writing.
pub async fn sync_one(
    target: &TargetDescriptor,
    resolver: &MetadataResolver,
    store: &dyn MetadataStore,
    options: SyncOptions,
    cancel: &CancellationToken,
) -> SyncOutcome {
    let Some(app_id) = target.app_id() else {
        return SyncOutcome::Skipped;
    };

    let existing = match store.get(app_id).await {
        Ok(existing) => existing,
        Err(e) => {
            warn!(app_id, error = %e, "could not read stored app");
            return SyncOutcome::Failed;
        }
    };
    if !options.should_fetch(existing.as_ref()) {
        debug!(app_id, "app already stored, skipping");
        return SyncOutcome::Skipped;
    }
    if existing.as_ref().is_some_and(AppRecord::needs_recheck) {
        info!(app_id, "rechecking existing app");
    }

    info!(app_id, "fetching app details");
    let resolved = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            debug!(app_id, "sync cancelled before lookup finished");
            return SyncOutcome::Cancelled;
        }
        resolved = resolver.resolve(target) => resolved,
    };
    let (metadata, outcome) = match resolved {
        Ok(app) => (app.to_metadata(), SyncOutcome::Stored),
        Err(MetadataError::NotFound { message, .. }) => {
            (AppMetadata::absent(message), SyncOutcome::StoredNotFound)
        }
        Err(e) if e.is_cancelled() => return SyncOutcome::Cancelled,
        Err(e) => {
            warn!(app_id, error = %e, "failed to resolve app details");
            return SyncOutcome::Failed;
        }
    };

    let stored = match AppRecord::from_metadata(target, &metadata) {
        Ok(record) => store.put(&record).await,
        Err(e) => Err(e),
    };
    match stored {
        Ok(()) => outcome,
        Err(e) => {
            warn!(app_id, error = %e, "failed to store app details");
            SyncOutcome::Failed
        }
    }
}
