//! Whole-pipeline retry for a single input line.
//!
//! One attempt is classify, resolve metadata for app targets, then fetch the
//! disclosure file through the single-flight cache. A failed attempt is
//! retried from classification after a fixed delay, up to a small budget.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::PipelineError;
use crate::cache::{ContentCacheEntry, SingleFlightCache};
use crate::metadata::MetadataResolver;
use crate::target::{TargetDescriptor, classify};

/// Default number of extra attempts per line.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 1;

/// Default fixed delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Decision on whether to retry a failed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the delay.
    Retry {
        /// How long to wait first.
        delay: Duration,
        /// The attempt number about to run (1-indexed).
        attempt: u32,
    },
    /// Give up and report the line.
    DoNotRetry {
        /// Why no retry happens.
        reason: String,
    },
}

/// Fixed-interval retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    extra_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy allowing `extra_attempts` retries spaced by `delay`.
    #[must_use]
    pub fn new(extra_attempts: u32, delay: Duration) -> Self {
        Self {
            extra_attempts,
            delay,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Total attempts including the first.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.extra_attempts.saturating_add(1)
    }

    /// Returns the fixed delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Decides whether the attempt that just failed should be followed by another.
    #[must_use]
    pub fn should_retry(&self, error: &PipelineError, attempt: u32) -> RetryDecision {
        if !error.is_retryable() {
            return RetryDecision::DoNotRetry {
                reason: "failure is not retryable".to_string(),
            };
        }
        if attempt >= self.max_attempts() {
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts()),
            };
        }
        RetryDecision::Retry {
            delay: self.delay,
            attempt: attempt + 1,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

/// A line whose disclosure file was fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedLine {
    /// The classified target.
    pub target: TargetDescriptor,
    /// App name, `-` for websites.
    pub app_name: String,
    /// Developer origin for apps, the website URL for websites.
    pub target_url: String,
    /// The disclosure-file URL that was fetched.
    pub disclosure_url: String,
    /// Cached page.
    pub entry: ContentCacheEntry,
}

/// A line that failed on every attempt.
#[derive(Debug, Clone)]
pub struct FailedLine {
    /// App name if metadata resolution got that far.
    pub app_name: Option<String>,
    /// Target URL if known.
    pub target_url: Option<String>,
    /// The last attempt's error.
    pub error: PipelineError,
    /// Attempts made.
    pub attempts: u32,
}

/// Final outcome of one input line.
#[derive(Debug, Clone)]
pub enum LineOutcome {
    /// Disclosure file fetched.
    Fetched(Box<FetchedLine>),
    /// Permanent failure after the retry budget.
    Failed(FailedLine),
    /// Input matched no target shape.
    Unrecognized,
}

/// Partial progress of one attempt, kept for the failure row.
#[derive(Debug, Default)]
struct Progress {
    app_name: Option<String>,
    target_url: Option<String>,
    // Disclosure URL follows from the input alone (websites).
    fixed_disclosure_url: bool,
}

/// Runs the classify, resolve, fetch pipeline with retries.
#[derive(Debug)]
pub struct RetryOrchestrator {
    resolver: Arc<MetadataResolver>,
    cache: Arc<SingleFlightCache>,
    policy: RetryPolicy,
}

impl RetryOrchestrator {
    /// Creates an orchestrator over a shared resolver and cache.
    #[must_use]
    pub fn new(
        resolver: Arc<MetadataResolver>,
        cache: Arc<SingleFlightCache>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            resolver,
            cache,
            policy,
        }
    }

    /// Returns the retry policy.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Returns the shared cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<SingleFlightCache> {
        &self.cache
    }

    /// Processes one input line to its final outcome.
    #[instrument(skip(self, cancel), fields(line = %line))]
    pub async fn process(&self, line: &str, cancel: &CancellationToken) -> LineOutcome {
        let mut attempt: u32 = 1;
        loop {
            let mut progress = Progress::default();
            let error = match self.attempt(line, &mut progress, cancel).await {
                Ok(Some(fetched)) => return LineOutcome::Fetched(Box::new(fetched)),
                Ok(None) => {
                    debug!("unrecognized target");
                    return LineOutcome::Unrecognized;
                }
                Err(error) => error,
            };

            let decision = if progress.fixed_disclosure_url && error.is_fetch() {
                // Failed keys stay failed; another attempt reaches the same key.
                RetryDecision::DoNotRetry {
                    reason: "disclosure failure is cached for this run".to_string(),
                }
            } else {
                self.policy.should_retry(&error, attempt)
            };

            match decision {
                RetryDecision::Retry {
                    delay,
                    attempt: next,
                } => {
                    info!(attempt, next, delay_ms = delay.as_millis(), error = %error, "retrying line");
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => {
                            return LineOutcome::Failed(FailedLine {
                                app_name: progress.app_name,
                                target_url: progress.target_url,
                                error: PipelineError::cancelled(line),
                                attempts: attempt,
                            });
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                    attempt = next;
                }
                RetryDecision::DoNotRetry { reason } => {
                    warn!(attempts = attempt, error = %error, reason = %reason, "line failed");
                    return LineOutcome::Failed(FailedLine {
                        app_name: progress.app_name,
                        target_url: progress.target_url,
                        error,
                        attempts: attempt,
                    });
                }
            }
        }
    }

    /// One pass of the pipeline. `Ok(None)` means the line is unrecognized.
    async fn attempt(
        &self,
        line: &str,
        progress: &mut Progress,
        cancel: &CancellationToken,
    ) -> Result<Option<FetchedLine>, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::cancelled(line));
        }

        let target = classify(line);
        let (app_name, target_url, disclosure_url) = match &target {
            TargetDescriptor::Unrecognized => return Ok(None),
            TargetDescriptor::Website { url } => {
                let Some(disclosure_url) = target.website_disclosure_url() else {
                    return Ok(None);
                };
                progress.fixed_disclosure_url = true;
                ("-".to_string(), url.clone(), disclosure_url)
            }
            TargetDescriptor::PlayStore { .. } | TargetDescriptor::AppStore { .. } => {
                let resolved = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(PipelineError::cancelled(line)),
                    resolved = self.resolver.resolve(&target) => resolved.map_err(PipelineError::metadata)?,
                };
                progress.app_name = Some(resolved.app_name.clone());
                (
                    resolved.app_name,
                    resolved.developer_origin,
                    resolved.disclosure_url,
                )
            }
        };
        progress.target_url = Some(target_url.clone());

        debug!(disclosure_url = %disclosure_url, "fetching disclosure file");
        let entry = self
            .cache
            .fetch_once(&disclosure_url, cancel)
            .await
            .map_err(PipelineError::fetch)?;

        Ok(Some(FetchedLine {
            target,
            app_name,
            target_url,
            disclosure_url,
            entry,
        }))
    }
}
