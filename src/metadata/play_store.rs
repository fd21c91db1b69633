//! Play Store native source: the localized details page.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, instrument};

use super::page::{select_attr, select_text};
use super::{MetadataError, MetadataSource, SourceStep};
use crate::fetch::{FetchError, PageSource};
use crate::target::TargetDescriptor;

/// Notes recorded when the details page answers 404.
pub const PLAY_NOT_FOUND_MESSAGE: &str = "App not found(404).";

const TITLE_SUFFIX: &str = " - Apps on Google Play";

/// Reads title and developer website from the Play Store details page.
pub struct PlayDetailsSource {
    fetcher: Arc<dyn PageSource>,
    play_store_base: String,
}

impl PlayDetailsSource {
    /// Creates a source reading `<play_store_base>/store/apps/details`.
    #[must_use]
    pub fn new(fetcher: Arc<dyn PageSource>, play_store_base: &str) -> Self {
        Self {
            fetcher,
            play_store_base: play_store_base.trim_end_matches('/').to_string(),
        }
    }

    fn details_url(&self, app_id: &str, country: &str, language: &str) -> String {
        format!(
            "{}/store/apps/details?id={app_id}&hl={language}&gl={country}",
            self.play_store_base
        )
    }
}

fn extract_details(body: &str) -> SourceStep {
    let document = Html::parse_document(body);

    let title = select_attr(&document, "meta[property='og:title']", "content")
        .map(|t| t.strip_suffix(TITLE_SUFFIX).map(str::to_string).unwrap_or(t))
        .or_else(|| select_text(&document, "[itemprop='name']"));

    let website = select_attr(&document, "meta[name='appstore:developer_url']", "content")
        .or_else(|| privacy_policy_link(&document));

    SourceStep::from_parts(title, website)
}

fn privacy_policy_link(document: &Html) -> Option<String> {
    let selector = Selector::parse("a[href]").ok()?;
    document
        .select(&selector)
        .find(|a| {
            a.text()
                .collect::<String>()
                .trim()
                .eq_ignore_ascii_case("privacy policy")
        })
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}

#[async_trait]
impl MetadataSource for PlayDetailsSource {
    fn name(&self) -> &'static str {
        "play_details"
    }

    fn can_handle(&self, target: &TargetDescriptor) -> bool {
        matches!(target, TargetDescriptor::PlayStore { .. })
    }

    #[instrument(skip(self), fields(source = "play_details"))]
    async fn resolve(&self, target: &TargetDescriptor) -> Result<SourceStep, MetadataError> {
        let TargetDescriptor::PlayStore {
            app_id,
            country,
            language,
        } = target
        else {
            return Err(MetadataError::Unsupported {
                target: format!("{target:?}"),
            });
        };

        let url = self.details_url(app_id, country, language);
        let body = match self.fetcher.fetch_text(&url).await {
            Ok(body) => body,
            Err(FetchError::AppNotFound { .. }) => {
                return Ok(SourceStep::NotFound(PLAY_NOT_FOUND_MESSAGE.to_string()));
            }
            Err(e) => return Err(MetadataError::fetch(app_id.as_str(), e)),
        };

        let step = extract_details(&body);
        debug!(app_id = %app_id, step = ?step, "Play details parsed");
        Ok(step)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_og_title_and_developer_meta() {
        let page = r#"<html><head>
            <meta property="og:title" content="Bar Runner - Apps on Google Play">
            <meta name="appstore:developer_url" content="https://bar.games/about">
            </head></html>"#;
        assert_eq!(
            extract_details(page),
            SourceStep::Found {
                app_name: "Bar Runner".into(),
                developer_website: "https://bar.games/about".into()
            }
        );
    }

    #[test]
    fn test_falls_back_to_itemprop_and_privacy_link() {
        let page = r#"<html><body>
            <h1 itemprop="name"><span>Bar Runner</span></h1>
            <a href="https://bar.games/terms">Terms</a>
            <a href="https://legal.bar.games/privacy">Privacy Policy</a>
            </body></html>"#;
        assert_eq!(
            extract_details(page),
            SourceStep::Found {
                app_name: "Bar Runner".into(),
                developer_website: "https://legal.bar.games/privacy".into()
            }
        );
    }

    #[test]
    fn test_missing_website_is_incomplete() {
        let page = r#"<meta property="og:title" content="Bar Runner - Apps on Google Play">"#;
        assert!(matches!(extract_details(page), SourceStep::Incomplete(_)));
    }

    #[test]
    fn test_details_url() {
        struct Never;
        #[async_trait]
        impl PageSource for Never {
            async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
                Err(FetchError::invalid_url(url))
            }
            async fn fetch_page(&self, url: &str) -> Result<crate::fetch::FetchedPage, FetchError> {
                Err(FetchError::invalid_url(url))
            }
        }
        let source = PlayDetailsSource::new(Arc::new(Never), "https://play.google.com");
        assert_eq!(
            source.details_url("com.example", "de", "fr"),
            "https://play.google.com/store/apps/details?id=com.example&hl=fr&gl=de"
        );
    }

    #[tokio::test]
    async fn test_404_maps_to_not_found_step() {
        struct Missing;
        #[async_trait]
        impl PageSource for Missing {
            async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
                Err(FetchError::from_status(url, 404))
            }
            async fn fetch_page(&self, url: &str) -> Result<crate::fetch::FetchedPage, FetchError> {
                Err(FetchError::from_status(url, 404))
            }
        }
        let source = PlayDetailsSource::new(Arc::new(Missing), "https://play.google.com");
        let target = TargetDescriptor::PlayStore {
            app_id: "com.example".into(),
            country: "us".into(),
            language: "en".into(),
        };
        let step = source.resolve(&target).await.unwrap();
        assert_eq!(step, SourceStep::NotFound(PLAY_NOT_FOUND_MESSAGE.into()));
    }
}
