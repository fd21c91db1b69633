//! Bare bundle identifiers.

use std::sync::LazyLock;

use regex::Regex;

use super::{DEFAULT_COUNTRY, DEFAULT_LANGUAGE, TargetDescriptor};

#[allow(clippy::expect_used)]
static PLAY_BUNDLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*(?:\.[A-Za-z][A-Za-z0-9_]*)+$")
        .expect("bundle regex is valid") // Static pattern, safe to panic
});

/// A bundle identifier given without any store URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleId {
    /// Reverse-DNS package name, e.g. `com.example.app`.
    Play(String),
    /// Numeric App Store track id.
    AppStore(String),
}

impl BundleId {
    /// Builds the descriptor directly: country `us`, Play language `en`.
    #[must_use]
    pub fn into_descriptor(self) -> TargetDescriptor {
        match self {
            Self::Play(app_id) => TargetDescriptor::PlayStore {
                app_id,
                country: DEFAULT_COUNTRY.to_string(),
                language: DEFAULT_LANGUAGE.to_string(),
            },
            Self::AppStore(app_id) => TargetDescriptor::AppStore {
                app_id,
                country: DEFAULT_COUNTRY.to_string(),
            },
        }
    }
}

/// Detects a bare bundle id.
///
/// Numeric strings are always App Store ids; reverse-DNS strings need at
/// least two letter-led segments.
#[must_use]
pub fn detect_bundle_id(input: &str) -> Option<BundleId> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if input.bytes().all(|b| b.is_ascii_digit()) {
        return Some(BundleId::AppStore(input.to_string()));
    }
    if PLAY_BUNDLE_RE.is_match(input) {
        return Some(BundleId::Play(input.to_string()));
    }
    None
}
