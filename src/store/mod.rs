//! Persistent app metadata, remembered across runs.
//!
//! Only the `sync-apps` workflow reads and writes this store; the scan path
//! always resolves metadata live.

use async_trait::async_trait;
use sqlx::FromRow;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::db::Database;
use crate::metadata::AppMetadata;
use crate::target::{Store, TargetDescriptor};

/// Notes marker for App Store responses that should be looked up again.
pub const RECHECK_MARKER: &str = "Could not parse app store response";

/// Errors from the metadata store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying query failed.
    #[error("metadata store query failed: {0}")]
    Database(#[from] sqlx::Error),

    /// The target is not an app and cannot be stored.
    #[error("not an app target: {target}")]
    NotAnApp {
        /// Debug rendering of the target.
        target: String,
    },
}

/// One row of the `apps` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct AppRecord {
    /// Store app id (primary key).
    pub app_id: String,
    /// Display name, if resolved.
    pub app_name: Option<String>,
    /// Developer origin, if resolved.
    pub app_domain: Option<String>,
    /// Persisted [`Store`] code.
    pub store: i64,
    /// Storefront country.
    pub country: Option<String>,
    /// Listing language (empty for App Store).
    pub language: Option<String>,
    /// When the record was last written (`SQLite` datetime text).
    pub last_checked_at: String,
    /// Store notes, e.g. a not-found message.
    pub notes: Option<String>,
}

impl AppRecord {
    fn for_target(target: &TargetDescriptor) -> Result<Self, StoreError> {
        let (Some(store), Some(app_id)) = (target.store(), target.app_id()) else {
            return Err(StoreError::NotAnApp {
                target: format!("{target:?}"),
            });
        };
        Ok(Self {
            app_id: app_id.to_string(),
            app_name: None,
            app_domain: None,
            store: store.code(),
            country: target.country().map(str::to_string),
            language: target.language().map(str::to_string),
            last_checked_at: String::new(),
            notes: None,
        })
    }

    /// Record for whatever metadata resolution produced: a resolved app, or
    /// an absent one carrying the store's not-found message as notes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotAnApp`] for website or unrecognized targets.
    pub fn from_metadata(
        target: &TargetDescriptor,
        metadata: &AppMetadata,
    ) -> Result<Self, StoreError> {
        let mut record = Self::for_target(target)?;
        record.app_name = Some(metadata.app_name.clone()).filter(|name| name != "-");
        record.app_domain.clone_from(&metadata.developer_website);
        record.notes.clone_from(&metadata.source_notes);
        Ok(record)
    }

    /// Returns the decoded store.
    #[must_use]
    pub fn store(&self) -> Option<Store> {
        Store::from_code(self.store)
    }

    /// Returns true if an earlier lookup could not be parsed and should be retried.
    #[must_use]
    pub fn needs_recheck(&self) -> bool {
        self.notes
            .as_deref()
            .is_some_and(|notes| notes.contains(RECHECK_MARKER))
    }
}

/// Keyed store of app metadata.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Looks a record up by app id.
    async fn get(&self, app_id: &str) -> Result<Option<AppRecord>, StoreError>;

    /// Inserts or replaces a record, stamping `last_checked_at`.
    async fn put(&self, record: &AppRecord) -> Result<(), StoreError>;
}

/// [`MetadataStore`] backed by the `apps` table.
#[derive(Debug, Clone)]
pub struct SqliteMetadataStore {
    db: Database,
}

impl SqliteMetadataStore {
    /// Wraps an opened database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the number of stored apps.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn count(&self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM apps")
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    #[instrument(skip(self))]
    async fn get(&self, app_id: &str) -> Result<Option<AppRecord>, StoreError> {
        let record = sqlx::query_as::<_, AppRecord>(
            r"SELECT app_id, app_name, app_domain, store, country, language, last_checked_at, notes
              FROM apps
              WHERE app_id = ?",
        )
        .bind(app_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(record)
    }

    #[instrument(skip(self, record), fields(app_id = %record.app_id))]
    async fn put(&self, record: &AppRecord) -> Result<(), StoreError> {
        sqlx::query(
            r"INSERT OR REPLACE INTO apps (
                app_id, app_name, app_domain, store, country, language, last_checked_at, notes
              )
              VALUES (?, ?, ?, ?, ?, ?, datetime('now'), ?)",
        )
        .bind(&record.app_id)
        .bind(&record.app_name)
        .bind(&record.app_domain)
        .bind(record.store)
        .bind(&record.country)
        .bind(&record.language)
        .bind(&record.notes)
        .execute(self.db.pool())
        .await?;
        debug!("app record stored");
        Ok(())
    }
}
