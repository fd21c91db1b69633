//! Single outbound page fetches.
//!
//! [`PageFetcher`] performs one HTTP GET per call with a random browser
//! User-Agent, bounded connect/read timeouts and redirect following. Non-2xx
//! responses and transport failures are classified into [`FetchError`].
//!
//! [`PageSource`] is the seam the cache and metadata sources depend on, so
//! they can be driven by test doubles.
//!
//! # Example
//!
//! ```no_run
//! use adscout_core::fetch::{FetchTimeouts, PageFetcher, PageSource};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = PageFetcher::new(FetchTimeouts::disclosure())?;
//! let page = fetcher.fetch_page("https://example.com/ads.txt").await?;
//! println!("{} bytes from {}", page.body.len(), page.final_url);
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;

pub use client::{FetchTimeouts, PageFetcher};
pub use constants::{
    DISCLOSURE_CONNECT_TIMEOUT, DISCLOSURE_READ_TIMEOUT, STORE_CONNECT_TIMEOUT, STORE_READ_TIMEOUT,
};
pub use error::FetchError;

use async_trait::async_trait;

/// A successfully fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Whether the final (post-redirect) URL uses HTTPS.
    pub is_https: bool,
    /// The `Content-Type` header, if present.
    pub content_type: Option<String>,
    /// The final URL after redirects.
    pub final_url: String,
    /// Response body decoded as text.
    pub body: String,
}

/// Source of pages over HTTP.
///
/// # Object Safety
///
/// Uses `async_trait` so the cache and metadata sources can hold
/// `Arc<dyn PageSource>`.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches `url` and returns the body only.
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;

    /// Fetches `url` and returns body, content type and final URL.
    async fn fetch_page(&self, url: &str) -> Result<FetchedPage, FetchError>;
}
