//! Ordered metadata source chain with fallback.

use tracing::{debug, info, instrument};

use super::{MetadataError, MetadataSource, ResolvedApp, SourceStep};
use crate::target::TargetDescriptor;

/// Ordered collection of metadata sources.
///
/// Sources are tried in registration order. The first `Found` step with a
/// usable website wins; `NotFound` and fetch errors end resolution at once.
pub struct MetadataResolver {
    sources: Vec<Box<dyn MetadataSource>>,
}

impl MetadataResolver {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Appends a source to the chain.
    #[tracing::instrument(skip(self, source), fields(source_name))]
    pub fn register(&mut self, source: Box<dyn MetadataSource>) {
        tracing::Span::current().record("source_name", source.name());
        debug!(name = source.name(), "Registering metadata source");
        self.sources.push(source);
    }

    /// Returns the number of registered sources.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Returns true if no sources are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Returns the sources that can handle `target`, in chain order.
    #[must_use]
    pub fn find_handlers(&self, target: &TargetDescriptor) -> Vec<&dyn MetadataSource> {
        self.sources
            .iter()
            .filter(|s| s.can_handle(target))
            .map(AsRef::as_ref)
            .collect()
    }

    /// Resolves an app target to its name and disclosure-file URL.
    ///
    /// # Errors
    ///
    /// - [`MetadataError::Unsupported`] if no source handles the target
    /// - [`MetadataError::NotFound`] as soon as a source reports the app missing
    /// - [`MetadataError::Fetch`] as soon as a source cannot reach its store
    /// - [`MetadataError::ExtractionFailed`] if every source came back incomplete
    #[instrument(skip(self), fields(app_id = target.app_id().unwrap_or("-")))]
    pub async fn resolve(&self, target: &TargetDescriptor) -> Result<ResolvedApp, MetadataError> {
        let handlers = self.find_handlers(target);
        if handlers.is_empty() {
            return Err(MetadataError::Unsupported {
                target: format!("{target:?}"),
            });
        }
        let app_id = target.app_id().unwrap_or_default();

        let mut last_reason = String::new();
        for handler in handlers {
            debug!(source = handler.name(), "Trying metadata source");

            match handler.resolve(target).await? {
                SourceStep::Found {
                    app_name,
                    developer_website,
                } => {
                    if let Some(resolved) =
                        ResolvedApp::from_website(app_name, &developer_website, handler.name())
                    {
                        info!(
                            source = handler.name(),
                            disclosure_url = %resolved.disclosure_url,
                            "Metadata resolved"
                        );
                        return Ok(resolved);
                    }
                    last_reason = format!("unusable developer website '{developer_website}'");
                    debug!(source = handler.name(), reason = %last_reason, "Trying next source");
                }
                SourceStep::Incomplete(reason) => {
                    debug!(source = handler.name(), reason = %reason, "Source incomplete, trying next");
                    last_reason = reason;
                }
                SourceStep::NotFound(message) => {
                    info!(source = handler.name(), message = %message, "Store reports app missing");
                    return Err(MetadataError::not_found(app_id, message));
                }
            }
        }

        Err(MetadataError::extraction_failed(app_id, last_reason))
    }
}

impl std::fmt::Debug for MetadataResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.sources.iter().map(|s| s.name()).collect();
        f.debug_struct("MetadataResolver")
            .field("source_count", &self.sources.len())
            .field("sources", &names)
            .finish()
    }
}

impl Default for MetadataResolver {
    fn default() -> Self {
        Self::new()
    }
}
