//! Bounded worker pool that scans every input line.
//!
//! # Concurrency Model
//!
//! - Each line runs in its own Tokio task
//! - A semaphore permit is acquired before a task starts its pipeline
//! - Rows are collected by input index, so output order matches input order
//! - The single-flight cache is the only state shared between tasks

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::{LineOutcome, RetryOrchestrator};
use crate::report::{ColumnMatcher, FetchedRow, ReportRow, RowStatus};

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 100;

/// Default worker pool size.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Default minimum number of non-blank lines before columns are extracted.
pub const DEFAULT_MIN_LINES: usize = 5;

/// Error type for scan engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// Counters for one scan run, updated from concurrent tasks.
#[derive(Debug, Default)]
pub struct ScanStats {
    succeeded: AtomicUsize,
    soft_failed: AtomicUsize,
    failed: AtomicUsize,
    malformed: AtomicUsize,
}

impl ScanStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines whose columns were extracted.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::SeqCst)
    }

    /// Lines fetched but too short.
    #[must_use]
    pub fn soft_failed(&self) -> usize {
        self.soft_failed.load(Ordering::SeqCst)
    }

    /// Lines that failed hard.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Lines that could not be classified.
    #[must_use]
    pub fn malformed(&self) -> usize {
        self.malformed.load(Ordering::SeqCst)
    }

    /// Total lines processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded() + self.soft_failed() + self.failed() + self.malformed()
    }

    fn record(&self, status: RowStatus) {
        let counter = match status {
            RowStatus::Succeeded => &self.succeeded,
            RowStatus::SoftFailed => &self.soft_failed,
            RowStatus::Failed => &self.failed,
            RowStatus::Malformed => &self.malformed,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

/// Result of a scan run.
#[derive(Debug)]
pub struct ScanReport {
    /// One row per non-blank input line, in input order.
    pub rows: Vec<ReportRow>,
    /// Hard-failed targets, in input order.
    pub failed: Vec<String>,
    /// Summary counters.
    pub stats: ScanStats,
}

/// Runs the per-line pipeline over a list of targets.
#[derive(Debug)]
pub struct ScanEngine {
    semaphore: Arc<Semaphore>,
    concurrency: usize,
    orchestrator: Arc<RetryOrchestrator>,
    matcher: Arc<ColumnMatcher>,
    min_lines: usize,
}

impl ScanEngine {
    /// Creates an engine.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if `concurrency` is outside 1..=100.
    #[instrument(level = "debug", skip(orchestrator, matcher))]
    pub fn new(
        concurrency: usize,
        orchestrator: Arc<RetryOrchestrator>,
        matcher: ColumnMatcher,
        min_lines: usize,
    ) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }
        debug!(
            concurrency,
            max_attempts = orchestrator.policy().max_attempts(),
            columns = matcher.len(),
            "creating scan engine"
        );
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            orchestrator,
            matcher: Arc::new(matcher),
            min_lines,
        })
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Scans every non-blank line and returns rows in input order.
    ///
    /// Individual line failures never fail the run; they become rows.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SemaphoreClosed`] if the pool semaphore is closed.
    #[instrument(skip(self, lines, cancel), fields(lines = lines.len()))]
    pub async fn run(
        &self,
        lines: &[String],
        cancel: &CancellationToken,
    ) -> Result<ScanReport, EngineError> {
        let stats = Arc::new(ScanStats::new());
        let mut handles = Vec::new();

        info!("starting scan");

        for (index, line) in lines.iter().enumerate() {
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }

            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| EngineError::SemaphoreClosed)?;

            let orchestrator = Arc::clone(&self.orchestrator);
            let matcher = Arc::clone(&self.matcher);
            let stats = Arc::clone(&stats);
            let cancel = cancel.clone();
            let min_lines = self.min_lines;
            let task_line = line.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                debug!(index, line = %task_line, "processing line");
                let outcome = orchestrator.process(&task_line, &cancel).await;
                let row = build_row(&task_line, &outcome, &matcher, min_lines);
                stats.record(row.status);
                row
            });
            handles.push((index, line, handle));
        }

        debug!(task_count = handles.len(), "waiting for lines to complete");

        let mut rows = Vec::with_capacity(handles.len());
        let mut failed = Vec::new();
        for (index, line, handle) in handles {
            let row = match handle.await {
                Ok(row) => row,
                Err(e) => {
                    warn!(index, error = %e, "line task panicked");
                    let row = ReportRow::failed(&line, None, None, "Internal error.", &self.matcher);
                    stats.record(row.status);
                    row
                }
            };
            if row.status.is_hard_failure() {
                failed.push(row.target.clone());
            }
            rows.push(row);
        }

        info!(
            succeeded = stats.succeeded(),
            soft_failed = stats.soft_failed(),
            failed = stats.failed(),
            malformed = stats.malformed(),
            "scan complete"
        );

        let stats = Arc::try_unwrap(stats).unwrap_or_else(|shared| {
            let copy = ScanStats::new();
            copy.succeeded.store(shared.succeeded(), Ordering::SeqCst);
            copy.soft_failed.store(shared.soft_failed(), Ordering::SeqCst);
            copy.failed.store(shared.failed(), Ordering::SeqCst);
            copy.malformed.store(shared.malformed(), Ordering::SeqCst);
            copy
        });

        Ok(ScanReport {
            rows,
            failed,
            stats,
        })
    }
}

/// Maps a line outcome to its report row.
#[must_use]
pub fn build_row(
    line: &str,
    outcome: &LineOutcome,
    matcher: &ColumnMatcher,
    min_lines: usize,
) -> ReportRow {
    match outcome {
        LineOutcome::Fetched(fetched) => ReportRow::fetched(
            &FetchedRow {
                target: line,
                app_name: &fetched.app_name,
                url: &fetched.target_url,
                disclosure_url: &fetched.disclosure_url,
                is_https: fetched.entry.is_https,
                content_type: fetched.entry.content_type.as_deref(),
                body: &fetched.entry.body,
            },
            matcher,
            min_lines,
        ),
        LineOutcome::Failed(failed) => ReportRow::failed(
            line,
            failed.app_name.as_deref(),
            failed.target_url.as_deref(),
            &failed.error.to_string(),
            matcher,
        ),
        LineOutcome::Unrecognized => ReportRow::unrecognized(line, matcher),
    }
}
