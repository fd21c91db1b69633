//! Error types for the per-line pipeline.

use thiserror::Error;

use crate::fetch::FetchError;
use crate::metadata::MetadataError;

/// Why one attempt at a line failed.
///
/// The display text is what ends up in the report's remark column.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// Metadata resolution failed.
    #[error(transparent)]
    Metadata(MetadataError),

    /// The disclosure file could not be fetched.
    #[error(transparent)]
    Fetch(FetchError),

    /// The run was cancelled.
    #[error("run cancelled")]
    Cancelled {
        /// The raw input line.
        input: String,
    },
}

impl PipelineError {
    /// Wraps a metadata error.
    #[must_use]
    pub fn metadata(source: MetadataError) -> Self {
        Self::Metadata(source)
    }

    /// Wraps a fetch error.
    #[must_use]
    pub fn fetch(source: FetchError) -> Self {
        Self::Fetch(source)
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(input: impl Into<String>) -> Self {
        Self::Cancelled {
            input: input.into(),
        }
    }

    /// Returns true if retrying the whole pipeline could change the outcome.
    ///
    /// Store not-found answers, cancellation and local cache IO are
    /// deterministic for the run and never retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Cancelled { .. } => false,
            Self::Metadata(e) => !(e.is_not_found() || e.is_cancelled()),
            Self::Fetch(e) => !matches!(e, FetchError::Cancelled { .. } | FetchError::CacheIo { .. }),
        }
    }

    /// Returns true if the disclosure-file fetch failed.
    #[must_use]
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }

    /// Returns true for cancellation, wherever it surfaced.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled { .. } => true,
            Self::Metadata(e) => e.is_cancelled(),
            Self::Fetch(e) => e.is_cancelled(),
        }
    }
}
