//! App metadata resolution: store target to developer website.
//!
//! An App Store or Play Store target has no disclosure file of its own; the
//! file lives at `<developer-origin>/app-ads.txt`. This module finds the
//! developer website through an ordered chain of [`MetadataSource`]s.
//!
//! # Architecture
//!
//! - [`MetadataSource`] - async trait each source implements
//! - [`MetadataResolver`] - ordered chain with fallback
//! - [`SourceStep`] - outcome of one source
//! - [`AppStoreLookupSource`] - iTunes lookup API
//! - [`PlayDetailsSource`] - Play Store details page meta tags
//! - [`StorePageSource`] - JSON-LD scraping of either store page (fallback)
//!
//! A `NotFound` step ends the chain immediately; `Incomplete` moves on to
//! the next source; a fetch error aborts resolution.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use adscout_core::fetch::{FetchTimeouts, PageFetcher};
//! use adscout_core::metadata::{MetadataEndpoints, build_default_metadata_resolver};
//! use adscout_core::target::classify;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Arc::new(PageFetcher::new(FetchTimeouts::store())?);
//! let resolver = build_default_metadata_resolver(fetcher, &MetadataEndpoints::default());
//! let target = classify("https://apps.apple.com/us/app/id284882215");
//! let app = resolver.resolve(&target).await?;
//! println!("{} -> {}", app.app_name, app.disclosure_url);
//! # Ok(())
//! # }
//! ```

mod app_store;
mod chain;
mod error;
mod page;
mod play_store;

pub use app_store::AppStoreLookupSource;
pub use chain::MetadataResolver;
pub use error::MetadataError;
pub use page::StorePageSource;
pub use play_store::PlayDetailsSource;

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::fetch::PageSource;
use crate::target::{DEFAULT_APP_STORE_BASE, DEFAULT_PLAY_STORE_BASE, TargetDescriptor};

/// Default iTunes lookup API base.
pub const DEFAULT_LOOKUP_BASE: &str = "https://itunes.apple.com";

/// File name of the app disclosure file under the developer origin.
pub const APP_DISCLOSURE_FILE: &str = "app-ads.txt";

/// Metadata for one app, as far as it could be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppMetadata {
    /// Display name, `-` when unknown.
    pub app_name: String,
    /// Developer website, normalized to `scheme://host`.
    pub developer_website: Option<String>,
    /// Notes from the store, e.g. a not-found message.
    pub source_notes: Option<String>,
}

impl AppMetadata {
    /// Metadata for an app the store reports as missing.
    #[must_use]
    pub fn absent(notes: impl Into<String>) -> Self {
        Self {
            app_name: "-".to_string(),
            developer_website: None,
            source_notes: Some(notes.into()),
        }
    }
}

/// A fully resolved app target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedApp {
    /// Display name of the app.
    pub app_name: String,
    /// Developer website normalized to `scheme://host`.
    pub developer_origin: String,
    /// `<developer_origin>/app-ads.txt`.
    pub disclosure_url: String,
    /// Name of the source that produced the result.
    pub source: String,
}

impl ResolvedApp {
    /// Builds a resolved app from a raw developer website.
    ///
    /// Returns `None` if the website has no usable host.
    #[must_use]
    pub fn from_website(
        app_name: impl Into<String>,
        website: &str,
        source: impl Into<String>,
    ) -> Option<Self> {
        let developer_origin = normalize_origin(website)?;
        let disclosure_url = format!("{developer_origin}/{APP_DISCLOSURE_FILE}");
        Some(Self {
            app_name: app_name.into(),
            developer_origin,
            disclosure_url,
            source: source.into(),
        })
    }

    /// Converts into the plain metadata record.
    #[must_use]
    pub fn to_metadata(&self) -> AppMetadata {
        AppMetadata {
            app_name: self.app_name.clone(),
            developer_website: Some(self.developer_origin.clone()),
            source_notes: None,
        }
    }
}

/// Outcome of a single metadata source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStep {
    /// Both a title and a developer website were found.
    Found {
        /// App title.
        app_name: String,
        /// Developer website, not yet normalized.
        developer_website: String,
    },
    /// The source answered but a title or website was missing; try the next one.
    Incomplete(String),
    /// The store reported the app as missing; stop the chain.
    NotFound(String),
}

impl SourceStep {
    /// Builds `Found` when both parts are present and non-blank, else `Incomplete`.
    #[must_use]
    pub fn from_parts(app_name: Option<String>, developer_website: Option<String>) -> Self {
        let app_name = app_name.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let developer_website = developer_website
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        match (app_name, developer_website) {
            (Some(app_name), Some(developer_website)) => Self::Found {
                app_name,
                developer_website,
            },
            (None, Some(_)) => Self::Incomplete("missing title".to_string()),
            (Some(_), None) => Self::Incomplete("missing developer website".to_string()),
            (None, None) => Self::Incomplete("missing title and developer website".to_string()),
        }
    }
}

/// A strategy that resolves app metadata for some targets.
///
/// # Object Safety
///
/// Uses `async_trait` so sources can be stored as `Box<dyn MetadataSource>`.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &str;

    /// Returns true if this source can resolve `target`.
    fn can_handle(&self, target: &TargetDescriptor) -> bool;

    /// Attempts resolution.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Fetch`] when the store could not be reached.
    async fn resolve(&self, target: &TargetDescriptor) -> Result<SourceStep, MetadataError>;
}

/// Base URLs for the store endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEndpoints {
    /// iTunes lookup API base.
    pub lookup_base: String,
    /// App Store front base.
    pub app_store_base: String,
    /// Play Store front base.
    pub play_store_base: String,
}

impl MetadataEndpoints {
    /// Points every endpoint at one base, e.g. a mock server.
    #[must_use]
    pub fn single_base(base: &str) -> Self {
        Self {
            lookup_base: base.to_string(),
            app_store_base: base.to_string(),
            play_store_base: base.to_string(),
        }
    }
}

impl Default for MetadataEndpoints {
    fn default() -> Self {
        Self {
            lookup_base: DEFAULT_LOOKUP_BASE.to_string(),
            app_store_base: DEFAULT_APP_STORE_BASE.to_string(),
            play_store_base: DEFAULT_PLAY_STORE_BASE.to_string(),
        }
    }
}

/// Builds the default chain: native store source first, then the page fallback.
#[must_use]
pub fn build_default_metadata_resolver(
    fetcher: Arc<dyn PageSource>,
    endpoints: &MetadataEndpoints,
) -> MetadataResolver {
    let mut resolver = MetadataResolver::new();
    resolver.register(Box::new(AppStoreLookupSource::new(
        fetcher.clone(),
        &endpoints.lookup_base,
    )));
    resolver.register(Box::new(PlayDetailsSource::new(
        fetcher.clone(),
        &endpoints.play_store_base,
    )));
    resolver.register(Box::new(StorePageSource::new(
        fetcher,
        &endpoints.app_store_base,
        &endpoints.play_store_base,
    )));
    resolver
}

/// Normalizes a website to `scheme://host[:port]`, dropping path and query.
///
/// Scheme-less inputs such as `www.example.com/about` are read as HTTPS.
#[must_use]
pub fn normalize_origin(website: &str) -> Option<String> {
    let website = website.trim();
    if website.is_empty() {
        return None;
    }
    let parsed = match Url::parse(website) {
        Ok(parsed) => parsed,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{website}")).ok()?
        }
        Err(_) => return None,
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str().filter(|h| !h.is_empty())?;
    Some(match parsed.port() {
        Some(port) => format!("{}://{host}:{port}", parsed.scheme()),
        None => format!("{}://{host}", parsed.scheme()),
    })
}
