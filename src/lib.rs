//! Adscout Core Library
//!
//! Discovers and audits `ads.txt` / `app-ads.txt` disclosure files for a list
//! of websites and mobile apps, and reports which seller lines each one
//! declares.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`target`] - Classifies raw input lines into websites and store apps
//! - [`fetch`] - Single HTTP GETs with bounded timeouts and error classification
//! - [`metadata`] - Ordered chain of store sources resolving app name and developer site
//! - [`cache`] - Single-flight, content-addressed cache of disclosure files
//! - [`pipeline`] - Per-line retries, the bounded worker pool and the metadata sync
//! - [`report`] - Column matching, report rows, input lists and CSV output
//! - [`store`] - Persistent app metadata used by the sync workflow
//! - [`db`] - `SQLite` connection and schema management
//! - [`config`] - Typed scan configuration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod config;
pub mod db;
pub mod fetch;
pub mod metadata;
pub mod pipeline;
pub mod report;
pub mod store;
pub mod target;
mod user_agent;

// Re-export commonly used types
pub use cache::{ContentCacheEntry, DiskSlots, FetchState, SingleFlightCache};
pub use config::{ConfigError, ScanConfig};
pub use db::{Database, DbError};
pub use fetch::{FetchError, FetchTimeouts, FetchedPage, PageFetcher, PageSource};
pub use metadata::{
    AppMetadata, MetadataEndpoints, MetadataError, MetadataResolver, ResolvedApp,
    build_default_metadata_resolver,
};
pub use pipeline::{
    AppSync, EngineError, LineOutcome, PipelineError, RetryOrchestrator, RetryPolicy, ScanEngine,
    ScanReport, ScanStats, SyncOptions, SyncStats,
};
pub use report::{ColumnMatcher, MatchMode, ReportError, ReportRow, read_lines};
pub use store::{AppRecord, MetadataStore, SqliteMetadataStore, StoreError};
pub use target::{Store, TargetDescriptor, classify};
