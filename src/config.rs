//! Typed scan configuration with defaults and range checks.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::cache::DiskSlots;
use crate::fetch::{
    DISCLOSURE_CONNECT_TIMEOUT, DISCLOSURE_READ_TIMEOUT, FetchTimeouts, STORE_CONNECT_TIMEOUT,
    STORE_READ_TIMEOUT,
};
use crate::pipeline::{
    DEFAULT_CONCURRENCY, DEFAULT_MIN_LINES, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY,
    RetryPolicy,
};

/// Maximum extra whole-pipeline attempts per line.
pub const MAX_RETRY_ATTEMPTS: u32 = 10;

/// Longest timeout accepted for any fetch.
const MAX_TIMEOUT: Duration = Duration::from_secs(3600);

/// Longest delay accepted between attempts.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// A configuration value outside its accepted range.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Numeric value outside its range.
    #[error("invalid `{field}`: {value} (expected {expected})")]
    OutOfRange {
        /// Field name.
        field: &'static str,
        /// Rendered offending value.
        value: String,
        /// Accepted range, human readable.
        expected: &'static str,
    },
}

impl ConfigError {
    fn out_of_range(field: &'static str, value: impl ToString, expected: &'static str) -> Self {
        Self::OutOfRange {
            field,
            value: value.to_string(),
            expected,
        }
    }
}

/// Everything a scan run needs besides its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Connect timeout for disclosure-file fetches.
    pub disclosure_connect_timeout: Duration,
    /// Read timeout for disclosure-file fetches.
    pub disclosure_read_timeout: Duration,
    /// Connect timeout for store pages and APIs.
    pub store_connect_timeout: Duration,
    /// Read timeout for store pages and APIs.
    pub store_read_timeout: Duration,
    /// Worker pool size.
    pub concurrency: usize,
    /// Extra whole-pipeline attempts per line.
    pub retry_attempts: u32,
    /// Fixed sleep between attempts.
    pub retry_delay: Duration,
    /// Minimum non-blank lines before columns are extracted.
    pub min_lines: usize,
    /// Directory holding cached disclosure bodies. `None` gives each run its
    /// own temporary directory, removed when the run ends.
    pub cache_dir: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            disclosure_connect_timeout: DISCLOSURE_CONNECT_TIMEOUT,
            disclosure_read_timeout: DISCLOSURE_READ_TIMEOUT,
            store_connect_timeout: STORE_CONNECT_TIMEOUT,
            store_read_timeout: STORE_READ_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            min_lines: DEFAULT_MIN_LINES,
            cache_dir: None,
        }
    }
}

impl ScanConfig {
    /// Checks every field against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] for the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.concurrency) {
            return Err(ConfigError::out_of_range(
                "concurrency",
                self.concurrency,
                "1..=100",
            ));
        }
        if self.retry_attempts > MAX_RETRY_ATTEMPTS {
            return Err(ConfigError::out_of_range(
                "retry_attempts",
                self.retry_attempts,
                "0..=10",
            ));
        }
        if self.retry_delay > MAX_RETRY_DELAY {
            return Err(ConfigError::out_of_range(
                "retry_delay",
                format!("{:?}", self.retry_delay),
                "at most 60s",
            ));
        }
        for (field, value) in [
            ("disclosure_connect_timeout", self.disclosure_connect_timeout),
            ("disclosure_read_timeout", self.disclosure_read_timeout),
            ("store_connect_timeout", self.store_connect_timeout),
            ("store_read_timeout", self.store_read_timeout),
        ] {
            if value.is_zero() || value > MAX_TIMEOUT {
                return Err(ConfigError::out_of_range(
                    field,
                    format!("{value:?}"),
                    "between 1ms and 3600s",
                ));
            }
        }
        Ok(())
    }

    /// Timeouts for the fetcher behind the disclosure cache.
    #[must_use]
    pub fn disclosure_timeouts(&self) -> FetchTimeouts {
        FetchTimeouts::new(self.disclosure_connect_timeout, self.disclosure_read_timeout)
    }

    /// Timeouts for the fetcher behind the metadata sources.
    #[must_use]
    pub fn store_timeouts(&self) -> FetchTimeouts {
        FetchTimeouts::new(self.store_connect_timeout, self.store_read_timeout)
    }

    /// Slot store for the disclosure cache: the configured directory, or a
    /// fresh temporary one.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the temporary directory cannot be created.
    pub fn disk_slots(&self) -> io::Result<DiskSlots> {
        match &self.cache_dir {
            Some(dir) => Ok(DiskSlots::new(dir)),
            None => DiskSlots::temporary(),
        }
    }

    /// Retry policy for the per-line orchestrator.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, self.retry_delay)
    }
}
