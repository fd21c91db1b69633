//! Store-page fallback: JSON-LD and listing markup scraping.
//!
//! Reached only when the native source answered without a title or website.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{MetadataError, MetadataSource, SourceStep};
use crate::fetch::PageSource;
use crate::target::{Store, TargetDescriptor};

const APP_EXTENSION_LINK: &str = "ul.inline-list--app-extensions a[href]";

/// Scrapes the public store listing of an app.
pub struct StorePageSource {
    fetcher: Arc<dyn PageSource>,
    app_store_base: String,
    play_store_base: String,
}

impl StorePageSource {
    /// Creates a source reading listings from the given store fronts.
    #[must_use]
    pub fn new(fetcher: Arc<dyn PageSource>, app_store_base: &str, play_store_base: &str) -> Self {
        Self {
            fetcher,
            app_store_base: app_store_base.trim_end_matches('/').to_string(),
            play_store_base: play_store_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MetadataSource for StorePageSource {
    fn name(&self) -> &'static str {
        "store_page"
    }

    fn can_handle(&self, target: &TargetDescriptor) -> bool {
        target.is_app()
    }

    #[instrument(skip(self), fields(source = "store_page"))]
    async fn resolve(&self, target: &TargetDescriptor) -> Result<SourceStep, MetadataError> {
        let (Some(store), Some(app_id), Some(url)) = (
            target.store(),
            target.app_id(),
            target.store_url_with_bases(&self.app_store_base, &self.play_store_base),
        ) else {
            return Err(MetadataError::Unsupported {
                target: format!("{target:?}"),
            });
        };

        let body = self
            .fetcher
            .fetch_text(&url)
            .await
            .map_err(|e| MetadataError::fetch(app_id, e))?;

        let step = extract_listing(store, &body);
        debug!(app_id, step = ?step, "Store page scraped");
        Ok(step)
    }
}

/// Extracts title and developer website from a listing page.
fn extract_listing(store: Store, body: &str) -> SourceStep {
    let document = Html::parse_document(body);
    let Some(json_ld) = json_ld_objects(&document).into_iter().find(|v| v.get("name").is_some())
    else {
        return SourceStep::Incomplete("no JSON-LD block with a name".to_string());
    };

    let title = json_ld.get("name").and_then(Value::as_str).map(str::to_string);
    let website = match store {
        Store::AppStore => select_attr(&document, APP_EXTENSION_LINK, "href"),
        Store::PlayStore => json_ld
            .get("author")
            .and_then(|author| author.get("url"))
            .and_then(Value::as_str)
            .map(str::to_string),
    };
    SourceStep::from_parts(title, website)
}

/// Returns every JSON-LD object on the page, flattening arrays and `@graph`.
pub(super) fn json_ld_objects(document: &Html) -> Vec<Value> {
    let mut objects = Vec::new();
    let Ok(selector) = Selector::parse("script[type='application/ld+json']") else {
        return objects;
    };
    for script in document.select(&selector) {
        let text = script.text().collect::<String>();
        if let Ok(value) = serde_json::from_str::<Value>(&text) {
            flatten_json_ld(value, &mut objects);
        }
    }
    objects
}

fn flatten_json_ld(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_json_ld(item, out);
            }
        }
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                flatten_json_ld(graph, out);
            }
            if !map.is_empty() {
                out.push(Value::Object(map));
            }
        }
        _ => {}
    }
}

/// First element matching `css`.
pub(super) fn select_first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    document.select(&selector).next()
}

/// Non-blank attribute of the first element matching `css`.
pub(super) fn select_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    select_first(document, css)
        .and_then(|el| el.value().attr(attr))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Non-blank text of the first element matching `css`.
pub(super) fn select_text(document: &Html, css: &str) -> Option<String> {
    select_first(document, css)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const APP_STORE_PAGE: &str = r#"<html><head>
        <script type="application/ld+json">{"@type":"SoftwareApplication","name":"Foo Puzzle","author":{"name":"Foo Inc"}}</script>
        </head><body>
        <ul class="inline-list inline-list--app-extensions">
          <li><a href="https://foo.dev/support?ref=appstore">Developer Website</a></li>
          <li><a href="https://foo.dev/privacy">Privacy</a></li>
        </ul></body></html>"#;

    const PLAY_PAGE: &str = r#"<html><head>
        <script type="application/ld+json">[{"@type":"SoftwareApplication","name":"Bar Runner","author":{"@type":"Person","name":"Bar","url":"https://bar.games/home"}}]</script>
        </head><body></body></html>"#;

    #[test]
    fn test_app_store_listing() {
        assert_eq!(
            extract_listing(Store::AppStore, APP_STORE_PAGE),
            SourceStep::Found {
                app_name: "Foo Puzzle".into(),
                developer_website: "https://foo.dev/support?ref=appstore".into()
            }
        );
    }

    #[test]
    fn test_play_listing_uses_author_url() {
        assert_eq!(
            extract_listing(Store::PlayStore, PLAY_PAGE),
            SourceStep::Found {
                app_name: "Bar Runner".into(),
                developer_website: "https://bar.games/home".into()
            }
        );
    }

    #[test]
    fn test_play_listing_without_author_is_incomplete() {
        let page = r#"<script type="application/ld+json">{"name":"Bar"}</script>"#;
        assert!(matches!(
            extract_listing(Store::PlayStore, page),
            SourceStep::Incomplete(_)
        ));
    }

    #[test]
    fn test_page_without_json_ld_is_incomplete() {
        assert!(matches!(
            extract_listing(Store::AppStore, "<html><body>nothing</body></html>"),
            SourceStep::Incomplete(_)
        ));
    }

    #[test]
    fn test_json_ld_graph_is_flattened() {
        let page = r#"<script type="application/ld+json">{"@context":"https://schema.org","@graph":[{"@type":"Organization","url":"https://x"},{"name":"Baz"}]}</script>
            <script type="application/ld+json">not json</script>"#;
        let doc = Html::parse_document(page);
        let objects = json_ld_objects(&doc);
        assert!(objects.iter().any(|o| o.get("name").and_then(Value::as_str) == Some("Baz")));
    }

    #[test]
    fn test_select_helpers() {
        let doc = Html::parse_document(r#"<h1 itemprop="name"> Title </h1><a href=" ">x</a>"#);
        assert_eq!(select_text(&doc, "[itemprop='name']").as_deref(), Some("Title"));
        assert_eq!(select_attr(&doc, "a", "href"), None);
    }
}
