//! Content-addressed on-disk slots for fetched disclosure bodies.
//!
//! Slot names are the SHA-256 of the cache key, so writers for different
//! keys never touch the same file. Staging files carry the process id and a
//! sequence number, so two processes sharing a directory never collide there.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tokio::fs;
use tracing::{debug, instrument};

/// Prefix of the per-run slot directory created under the system temp dir.
pub const SCRATCH_DIR_PREFIX: &str = "adscout-cache-";

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Directory of cache slots.
#[derive(Debug, Clone)]
pub struct DiskSlots {
    dir: PathBuf,
    // Removes the directory once the last clone is dropped.
    scratch: Option<Arc<TempDir>>,
}

impl DiskSlots {
    /// Creates a slot store rooted at `dir`. The directory is created lazily
    /// and left in place when the store is dropped.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            scratch: None,
        }
    }

    /// Creates a slot store in a fresh directory under the system temp dir.
    ///
    /// The directory and every slot in it are deleted when the last clone of
    /// the store is dropped.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the directory cannot be created.
    pub fn temporary() -> io::Result<Self> {
        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_DIR_PREFIX)
            .tempdir()?;
        Ok(Self {
            dir: scratch.path().to_path_buf(),
            scratch: Some(Arc::new(scratch)),
        })
    }

    /// Returns true if the directory is removed on drop.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.scratch.is_some()
    }

    /// Returns the slot directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the slot file for `key`.
    #[must_use]
    pub fn slot_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{digest:x}.txt"))
    }

    /// Writes `body` into the slot for `key` and returns the slot path.
    ///
    /// The body goes to a temporary sibling first and is renamed into place,
    /// so a slot path only ever holds a complete body.
    ///
    /// # Errors
    ///
    /// Returns the IO error from directory creation, write or rename.
    #[instrument(skip(self, body), fields(bytes = body.len()))]
    pub async fn write(&self, key: &str, body: &str) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir).await?;

        let slot = self.slot_path(key);
        let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
        let staging = slot.with_extension(format!("{}.{seq}.tmp", std::process::id()));
        if let Err(e) = fs::write(&staging, body.as_bytes()).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e);
        }
        if let Err(e) = fs::rename(&staging, &slot).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e);
        }

        debug!(slot = %slot.display(), "cache slot written");
        Ok(slot)
    }

    /// Reads a slot back.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the slot is missing or unreadable.
    pub async fn read(&self, slot: &Path) -> io::Result<String> {
        fs::read_to_string(slot).await
    }

    /// Removes the slot for `key` if it exists. Blocking; used from drop paths.
    ///
    /// # Errors
    ///
    /// Returns any IO error other than the slot being absent.
    pub fn discard(&self, key: &str) -> io::Result<()> {
        match std::fs::remove_file(self.slot_path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
