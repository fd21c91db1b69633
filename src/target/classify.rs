//! Ordered classification rules for raw target strings.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};
use url::Url;

use super::bundle::detect_bundle_id;
use super::{DEFAULT_COUNTRY, DEFAULT_LANGUAGE, TargetDescriptor};

/// Compiles a regex at static init; panics on invalid pattern.
fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// App Store detail page: optional two-letter storefront, optional slug, numeric id.
static APP_STORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r"^https?://apps\.apple\.com/(?:([A-Za-z]{2})/)?app(?:/[^/\s?#]+)?/id(\d+)(?:[/?#]\S*)?$",
    )
});

static PLAY_STORE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"^https?://play\.google\.com/store/apps/details\S*$"));

/// Classifies a raw input line.
///
/// Rules are checked in order and the first match wins:
/// 1. App Store detail URL
/// 2. Play Store detail URL (`id` is mandatory, `gl`/`hl` default to `us`/`en`)
/// 3. Absolute HTTP(S) URL with a dotted hostname
/// 4. Reverse-DNS bundle id (Play Store)
/// 5. Numeric bundle id (App Store)
///
/// Anything else is [`TargetDescriptor::Unrecognized`].
#[must_use]
#[tracing::instrument(level = "debug")]
pub fn classify(raw: &str) -> TargetDescriptor {
    let input = raw.trim();
    if let Some(target) = classify_url(input) {
        return target;
    }
    match detect_bundle_id(input) {
        Some(bundle) => {
            debug!(bundle = ?bundle, "classified as bare bundle id");
            bundle.into_descriptor()
        }
        None => {
            debug!("input matched no known target shape");
            TargetDescriptor::Unrecognized
        }
    }
}

/// Applies the URL-shaped rules (1-3) only.
///
/// Returns `None` when the input is not a recognizable URL so bundle-id
/// detection can take over. A Play Store URL without an `id` parameter is
/// [`TargetDescriptor::Unrecognized`], not a website.
#[must_use]
pub fn classify_url(input: &str) -> Option<TargetDescriptor> {
    let input = input.trim();

    if let Some(caps) = APP_STORE_RE.captures(input) {
        let country = caps
            .get(1)
            .map_or(DEFAULT_COUNTRY.to_string(), |m| m.as_str().to_ascii_lowercase());
        let app_id = caps.get(2).map(|m| m.as_str().to_string())?;
        trace!(%app_id, %country, "matched App Store URL");
        return Some(TargetDescriptor::AppStore { app_id, country });
    }

    if PLAY_STORE_RE.is_match(input) {
        return Some(classify_play_store_url(input));
    }

    if is_website_url(input) {
        trace!("matched website URL");
        return Some(TargetDescriptor::Website {
            url: input.to_string(),
        });
    }

    None
}

fn classify_play_store_url(input: &str) -> TargetDescriptor {
    let Ok(url) = Url::parse(input) else {
        return TargetDescriptor::Unrecognized;
    };

    let mut app_id = None;
    let mut country = None;
    let mut language = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "id" if app_id.is_none() => app_id = Some(value.trim().to_string()),
            "gl" if country.is_none() => country = Some(value.trim().to_ascii_lowercase()),
            "hl" if language.is_none() => language = Some(value.trim().to_ascii_lowercase()),
            _ => {}
        }
    }

    match app_id.filter(|id| !id.is_empty()) {
        Some(app_id) => TargetDescriptor::PlayStore {
            app_id,
            country: country
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
            language: language
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        },
        None => {
            debug!("Play Store URL without id parameter");
            TargetDescriptor::Unrecognized
        }
    }
}

fn is_website_url(input: &str) -> bool {
    if !(input.starts_with("http://") || input.starts_with("https://")) {
        return false;
    }
    let Ok(url) = Url::parse(input) else {
        return false;
    };
    url.host_str().is_some_and(|host| {
        host.contains('.') && !host.starts_with('.') && !host.ends_with('.')
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_play_store_url_applies_defaults() {
        assert_eq!(
            classify("https://play.google.com/store/apps/details?id=com.example.app"),
            TargetDescriptor::PlayStore {
                app_id: "com.example.app".into(),
                country: "us".into(),
                language: "en".into(),
            }
        );
    }

    #[test]
    fn test_classify_play_store_url_lowercases_locale() {
        assert_eq!(
            classify("https://play.google.com/store/apps/details?id=com.example.app&gl=DE&hl=De"),
            TargetDescriptor::PlayStore {
                app_id: "com.example.app".into(),
                country: "de".into(),
                language: "de".into(),
            }
        );
    }

    #[test]
    fn test_classify_play_store_url_without_id_is_unrecognized() {
        assert_eq!(
            classify("https://play.google.com/store/apps/details?hl=en"),
            TargetDescriptor::Unrecognized
        );
    }

    #[test]
    fn test_classify_app_store_url_with_slug() {
        assert_eq!(
            classify("https://apps.apple.com/gb/app/foo/id123456789"),
            TargetDescriptor::AppStore {
                app_id: "123456789".into(),
                country: "gb".into(),
            }
        );
    }

    #[test]
    fn test_classify_app_store_url_uppercase_country() {
        assert_eq!(
            classify("https://apps.apple.com/GB/app/foo/id42?mt=8"),
            TargetDescriptor::AppStore {
                app_id: "42".into(),
                country: "gb".into(),
            }
        );
    }

    #[test]
    fn test_classify_app_store_url_without_locale() {
        assert_eq!(
            classify("https://apps.apple.com/app/id555"),
            TargetDescriptor::AppStore {
                app_id: "555".into(),
                country: "us".into(),
            }
        );
    }

    #[test]
    fn test_classify_website() {
        assert_eq!(
            classify("  https://www.example.com  "),
            TargetDescriptor::Website {
                url: "https://www.example.com".into()
            }
        );
    }

    #[test]
    fn test_classify_website_requires_dotted_host() {
        assert_eq!(classify("http://localhost/"), TargetDescriptor::Unrecognized);
    }

    #[test]
    fn test_classify_bare_play_bundle() {
        assert_eq!(
            classify("com.example.game_2"),
            TargetDescriptor::PlayStore {
                app_id: "com.example.game_2".into(),
                country: "us".into(),
                language: "en".into(),
            }
        );
    }

    #[test]
    fn test_classify_numeric_bundle_is_app_store() {
        assert_eq!(
            classify("1234567"),
            TargetDescriptor::AppStore {
                app_id: "1234567".into(),
                country: "us".into(),
            }
        );
    }

    #[test]
    fn test_classify_garbage_is_unrecognized() {
        assert_eq!(classify("not a target!"), TargetDescriptor::Unrecognized);
        assert_eq!(classify(""), TargetDescriptor::Unrecognized);
        assert_eq!(classify("ftp://example.com"), TargetDescriptor::Unrecognized);
    }

    #[test]
    fn test_classify_url_returns_none_for_bundle() {
        assert!(classify_url("com.example.app").is_none());
    }
}
