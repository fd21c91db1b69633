//! Error types for app metadata resolution.

use thiserror::Error;

use crate::fetch::FetchError;

/// Errors that can occur while resolving an app's name and developer website.
#[derive(Debug, Clone, Error)]
pub enum MetadataError {
    /// The native store API definitively reported no such app.
    ///
    /// Terminal: the fallback chain stops and the pipeline does not retry.
    #[error("{message}")]
    NotFound {
        /// The app id that was looked up.
        app_id: String,
        /// Message from the store, kept as the record's notes.
        message: String,
    },

    /// No source produced both a title and a developer website.
    #[error("could not extract metadata for {app_id}: {reason}")]
    ExtractionFailed {
        /// The app id being resolved.
        app_id: String,
        /// What was missing.
        reason: String,
    },

    /// A store page or API could not be fetched.
    #[error("metadata fetch failed for {app_id}: {source}")]
    Fetch {
        /// The app id being resolved.
        app_id: String,
        /// Underlying fetch error.
        #[source]
        source: FetchError,
    },

    /// No registered source handles this target.
    #[error("no metadata source for target {target}")]
    Unsupported {
        /// Debug rendering of the target.
        target: String,
    },
}

impl MetadataError {
    /// Creates a `NotFound` error.
    pub fn not_found(app_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            app_id: app_id.into(),
            message: message.into(),
        }
    }

    /// Creates an `ExtractionFailed` error.
    pub fn extraction_failed(app_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExtractionFailed {
            app_id: app_id.into(),
            reason: reason.into(),
        }
    }

    /// Wraps a fetch error.
    pub fn fetch(app_id: impl Into<String>, source: FetchError) -> Self {
        Self::Fetch {
            app_id: app_id.into(),
            source,
        }
    }

    /// Returns true if the store reported the app as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the underlying fetch was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Fetch { source, .. } if source.is_cancelled())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_displays_store_message_only() {
        let err = MetadataError::not_found("123", "No app found with ID 123");
        assert_eq!(err.to_string(), "No app found with ID 123");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_fetch_error_keeps_source() {
        let err = MetadataError::fetch("com.example", FetchError::from_status("https://x/y", 503));
        assert!(!err.is_not_found());
        let msg = err.to_string();
        assert!(msg.contains("com.example"), "{msg}");
        assert!(msg.contains("503"), "{msg}");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_is_cancelled() {
        let err = MetadataError::fetch("1", FetchError::cancelled("https://x"));
        assert!(err.is_cancelled());
        assert!(!MetadataError::extraction_failed("1", "no title").is_cancelled());
    }
}
