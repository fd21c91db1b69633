//! Error types for page fetches.
//!
//! Fetch errors are cached by the single-flight layer and handed to every
//! caller of the same URL, so the type is `Clone`; transport causes are kept
//! behind an `Arc` to preserve the source chain.

use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur while fetching a page.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Transport failure: timeout, refused or reset connection, DNS, TLS.
    #[error("connection error fetching {url}: {source}")]
    Connection {
        /// The URL being fetched.
        url: String,
        /// Underlying transport error.
        #[source]
        source: Arc<reqwest::Error>,
    },

    /// Server answered HTTP 429.
    #[error("rate limited fetching {url} (HTTP 429)")]
    RateLimited {
        /// The URL being fetched.
        url: String,
    },

    /// HTTP 404 for a disclosure file.
    #[error("ads.txt not found at {url} (HTTP 404)")]
    AdsTxtNotFound {
        /// The disclosure-file URL.
        url: String,
    },

    /// HTTP 404 for anything that is not a disclosure file (store pages).
    #[error("app not found at {url} (HTTP 404)")]
    AppNotFound {
        /// The URL being fetched.
        url: String,
    },

    /// Any other non-2xx status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL being fetched.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The URL could not be parsed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The rejected URL string.
        url: String,
    },

    /// The run was cancelled before the fetch completed.
    #[error("fetch of {url} cancelled")]
    Cancelled {
        /// The URL being fetched.
        url: String,
    },

    /// The content cache slot could not be written or read.
    #[error("cache IO error for {url}: {message}")]
    CacheIo {
        /// The disclosure-file URL owning the slot.
        url: String,
        /// IO error description.
        message: String,
    },
}

impl FetchError {
    /// Creates a transport error from a reqwest error.
    pub fn connection(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Connection {
            url: url.into(),
            source: Arc::new(source),
        }
    }

    /// Classifies a non-2xx status code.
    ///
    /// 404 splits on whether the URL path names a disclosure file
    /// (`ads.txt` or `app-ads.txt`).
    pub fn from_status(url: impl Into<String>, status: u16) -> Self {
        let url = url.into();
        match status {
            429 => Self::RateLimited { url },
            404 if references_disclosure_file(&url) => Self::AdsTxtNotFound { url },
            404 => Self::AppNotFound { url },
            status => Self::HttpStatus { url, status },
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Creates a cache IO error.
    pub fn cache_io(url: impl Into<String>, source: &std::io::Error) -> Self {
        Self::CacheIo {
            url: url.into(),
            message: source.to_string(),
        }
    }

    /// Returns the URL the error refers to.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Connection { url, .. }
            | Self::RateLimited { url }
            | Self::AdsTxtNotFound { url }
            | Self::AppNotFound { url }
            | Self::HttpStatus { url, .. }
            | Self::InvalidUrl { url }
            | Self::Cancelled { url }
            | Self::CacheIo { url, .. } => url,
        }
    }

    /// Returns true for cancellation errors.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

fn references_disclosure_file(url: &str) -> bool {
    let path = url::Url::parse(url)
        .map(|parsed| parsed.path().to_ascii_lowercase())
        .unwrap_or_else(|_| url.to_ascii_lowercase());
    path.ends_with("ads.txt")
}
