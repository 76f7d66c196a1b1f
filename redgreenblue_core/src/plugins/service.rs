use std::sync::Arc;

use tracing::{debug, info};

use super::{PluginCapabilities, PluginRegistry, PluginSummary, RewritePlugin, RewriteRequest};
use crate::{Error, Result};

/// High-level façade for invoking rewrite plugins by id.
#[derive(Clone)]
pub struct PluginService {
    registry: Arc<PluginRegistry>,
}

impl PluginService {
    /// Create a plugin service backed by the provided registry.
    #[must_use]
    pub fn new(registry: PluginRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Access the underlying registry.
    #[must_use]
    pub fn registry(&self) -> Arc<PluginRegistry> {
        Arc::clone(&self.registry)
    }

    /// List summaries for all registered plugins.
    #[must_use]
    pub fn summaries(&self) -> Vec<PluginSummary> {
        self.registry.summaries()
    }

    /// Fetch capabilities for a plugin, if registered.
    #[must_use]
    pub fn capabilities(&self, plugin_id: &str) -> Option<PluginCapabilities> {
        self.registry.capabilities(plugin_id)
    }

    /// Ask the plugin for a replacement of the submitted text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PluginNotRegistered`] when the id is unknown or
    /// [`Error::Plugin`] when the plugin fails.
    pub async fn rewrite(&self, plugin_id: &str, request: RewriteRequest) -> Result<String> {
        let plugin = self.plugin(plugin_id)?;
        debug!(
            plugin = plugin_id,
            bytes = request.text.len(),
            prompts = request.prompt_lines.len(),
            "submitting rewrite request"
        );

        let replacement = plugin
            .rewrite(request)
            .await
            .map_err(|source| Error::Plugin {
                plugin: plugin_id.to_string(),
                source,
            })?;

        info!(plugin = plugin_id, bytes = replacement.len(), "rewrite received");
        Ok(replacement)
    }

    fn plugin(&self, plugin_id: &str) -> Result<Arc<dyn RewritePlugin>> {
        self.registry
            .get(plugin_id)
            .ok_or_else(|| Error::PluginNotRegistered {
                plugin: plugin_id.to_string(),
            })
    }
}

impl std::fmt::Debug for PluginService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let plugin_ids: Vec<&str> = self.registry.ids().collect();
        f.debug_struct("PluginService")
            .field("plugins", &plugin_ids)
            .finish()
    }
}
