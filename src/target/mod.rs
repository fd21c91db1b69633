//! Target classification for raw input lines.
//!
//! Every input line is one of: an App Store detail URL, a Play Store detail
//! URL, a website URL, or a bare bundle identifier. This module turns the raw
//! string into a typed [`TargetDescriptor`] before any network work happens.
//!
//! # Architecture
//!
//! - [`classify`] - ordered rule set, first match wins
//! - [`classify_url`] - the URL-shaped rules only (App Store, Play Store, website)
//! - [`BundleId`] - bare bundle ids that need a synthesized store URL
//!
//! # Example
//!
//! ```
//! use adscout_core::target::{TargetDescriptor, classify};
//!
//! let target = classify("https://apps.apple.com/gb/app/foo/id123456789");
//! assert_eq!(
//!     target,
//!     TargetDescriptor::AppStore { app_id: "123456789".into(), country: "gb".into() }
//! );
//! ```

mod bundle;
mod classify;

pub use bundle::{BundleId, detect_bundle_id};
pub use classify::{classify, classify_url};

/// Default App Store front used for synthesized URLs.
pub const DEFAULT_APP_STORE_BASE: &str = "https://apps.apple.com";

/// Default Play Store front used for synthesized URLs.
pub const DEFAULT_PLAY_STORE_BASE: &str = "https://play.google.com";

/// Default storefront country when the input does not carry one.
pub const DEFAULT_COUNTRY: &str = "us";

/// Default Play Store listing language.
pub const DEFAULT_LANGUAGE: &str = "en";

/// App marketplace a target belongs to.
///
/// The discriminants are the persisted values in the metadata store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Store {
    /// Apple App Store.
    AppStore = 0,
    /// Google Play Store.
    PlayStore = 1,
}

impl Store {
    /// Returns the persisted integer code.
    #[must_use]
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Parses a persisted integer code.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::AppStore),
            1 => Some(Self::PlayStore),
            _ => None,
        }
    }
}

/// Classified input line.
///
/// Created once per input line and discarded once that line's pipeline
/// completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetDescriptor {
    /// Google Play listing.
    PlayStore {
        /// Package name (`id` query parameter).
        app_id: String,
        /// Lower-cased storefront country (`gl`).
        country: String,
        /// Lower-cased listing language (`hl`).
        language: String,
    },
    /// Apple App Store listing.
    AppStore {
        /// Numeric track id.
        app_id: String,
        /// Lower-cased storefront country.
        country: String,
    },
    /// Any other website; its disclosure file is `<url>/ads.txt`.
    Website {
        /// The website URL as given.
        url: String,
    },
    /// Input matched none of the known shapes.
    Unrecognized,
}

impl TargetDescriptor {
    /// Returns the store for app targets.
    #[must_use]
    pub fn store(&self) -> Option<Store> {
        match self {
            Self::PlayStore { .. } => Some(Store::PlayStore),
            Self::AppStore { .. } => Some(Store::AppStore),
            Self::Website { .. } | Self::Unrecognized => None,
        }
    }

    /// Returns the app id for app targets.
    #[must_use]
    pub fn app_id(&self) -> Option<&str> {
        match self {
            Self::PlayStore { app_id, .. } | Self::AppStore { app_id, .. } => Some(app_id),
            Self::Website { .. } | Self::Unrecognized => None,
        }
    }

    /// Returns the storefront country for app targets.
    #[must_use]
    pub fn country(&self) -> Option<&str> {
        match self {
            Self::PlayStore { country, .. } | Self::AppStore { country, .. } => Some(country),
            Self::Website { .. } | Self::Unrecognized => None,
        }
    }

    /// Returns the listing language; App Store targets carry an empty language.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        match self {
            Self::PlayStore { language, .. } => Some(language),
            Self::AppStore { .. } => Some(""),
            Self::Website { .. } | Self::Unrecognized => None,
        }
    }

    /// Returns true for Play Store and App Store targets.
    #[must_use]
    pub fn is_app(&self) -> bool {
        self.store().is_some()
    }

    /// Returns the canonical listing URL on the public store fronts.
    #[must_use]
    pub fn store_url(&self) -> Option<String> {
        self.store_url_with_bases(DEFAULT_APP_STORE_BASE, DEFAULT_PLAY_STORE_BASE)
    }

    /// Returns the listing URL against custom store fronts (used by tests and mirrors).
    #[must_use]
    pub fn store_url_with_bases(&self, app_store_base: &str, play_store_base: &str) -> Option<String> {
        match self {
            Self::AppStore { app_id, country } => Some(format!(
                "{}/{country}/app/id{app_id}",
                app_store_base.trim_end_matches('/')
            )),
            Self::PlayStore {
                app_id,
                country,
                language,
            } => Some(format!(
                "{}/store/apps/details?id={app_id}&gl={country}&hl={language}",
                play_store_base.trim_end_matches('/')
            )),
            Self::Website { .. } | Self::Unrecognized => None,
        }
    }

    /// Returns the disclosure-file URL for website targets.
    ///
    /// App targets need metadata resolution first and return `None`.
    #[must_use]
    pub fn website_disclosure_url(&self) -> Option<String> {
        match self {
            Self::Website { url } => Some(format!("{}/ads.txt", url.trim_end_matches('/'))),
            _ => None,
        }
    }
}
