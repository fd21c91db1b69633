//! App Store native source backed by the iTunes lookup API.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{MetadataError, MetadataSource, SourceStep};
use crate::fetch::PageSource;
use crate::target::TargetDescriptor;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    result_count: u64,
    #[serde(default)]
    results: Vec<LookupResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResult {
    track_name: Option<String>,
    seller_url: Option<String>,
}

/// Looks App Store apps up by id and storefront.
pub struct AppStoreLookupSource {
    fetcher: Arc<dyn PageSource>,
    lookup_base: String,
}

impl AppStoreLookupSource {
    /// Creates a source querying `<lookup_base>/lookup`.
    #[must_use]
    pub fn new(fetcher: Arc<dyn PageSource>, lookup_base: &str) -> Self {
        Self {
            fetcher,
            lookup_base: lookup_base.trim_end_matches('/').to_string(),
        }
    }

    fn lookup_url(&self, app_id: &str, country: &str) -> String {
        format!(
            "{}/lookup?id={app_id}&country={country}&entity=software",
            self.lookup_base
        )
    }
}

/// Interprets a lookup API body.
fn parse_lookup(app_id: &str, body: &str) -> SourceStep {
    let Ok(response) = serde_json::from_str::<LookupResponse>(body) else {
        return SourceStep::NotFound(format!(
            "Could not parse app store response for ID {app_id}"
        ));
    };
    let Some(first) = response.results.into_iter().next().filter(|_| response.result_count > 0)
    else {
        return SourceStep::NotFound(format!("No app found with ID {app_id}"));
    };
    SourceStep::from_parts(first.track_name, first.seller_url)
}

#[async_trait]
impl MetadataSource for AppStoreLookupSource {
    fn name(&self) -> &'static str {
        "app_store_lookup"
    }

    fn can_handle(&self, target: &TargetDescriptor) -> bool {
        matches!(target, TargetDescriptor::AppStore { .. })
    }

    #[instrument(skip(self), fields(source = "app_store_lookup"))]
    async fn resolve(&self, target: &TargetDescriptor) -> Result<SourceStep, MetadataError> {
        let TargetDescriptor::AppStore { app_id, country } = target else {
            return Err(MetadataError::Unsupported {
                target: format!("{target:?}"),
            });
        };

        let url = self.lookup_url(app_id, country);
        let body = self
            .fetcher
            .fetch_text(&url)
            .await
            .map_err(|e| MetadataError::fetch(app_id.as_str(), e))?;

        let step = parse_lookup(app_id, &body);
        debug!(app_id = %app_id, step = ?step, "App Store lookup parsed");
        Ok(step)
    }
}
