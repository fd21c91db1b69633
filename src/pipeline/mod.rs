//! Per-line pipeline, worker pool and metadata sync.
//!
//! - [`RetryOrchestrator`] - classify, resolve, fetch for one line with whole-pipeline retries
//! - [`ScanEngine`] - bounded pool of line tasks producing ordered report rows
//! - [`AppSync`] - resolves app targets into the persistent metadata store

mod engine;
mod error;
mod orchestrator;
mod sync;

pub use engine::{
    DEFAULT_CONCURRENCY, DEFAULT_MIN_LINES, EngineError, ScanEngine, ScanReport, ScanStats,
    build_row,
};
pub use error::PipelineError;
pub use orchestrator::{
    DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY, FailedLine, FetchedLine, LineOutcome,
    RetryDecision, RetryOrchestrator, RetryPolicy,
};
pub use sync::{
    AppSync, DEFAULT_SYNC_CONCURRENCY, SyncOptions, SyncOutcome, SyncStats, sync_one,
};
