//! Plugin registry keeps track of available rewrite integrations.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{PluginCapabilities, PluginSummary, RewritePlugin};

/// In-memory registry for rewrite plugins.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: HashMap<&'static str, Arc<dyn RewritePlugin>>,
}

impl PluginRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin keyed by its `RewritePlugin::id`.
    pub fn register<P>(&mut self, plugin: P)
    where
        P: RewritePlugin + 'static,
    {
        self.register_arc(Arc::new(plugin));
    }

    /// Register an already shared plugin instance.
    pub fn register_arc(&mut self, plugin: Arc<dyn RewritePlugin>) {
        self.plugins.insert(plugin.id(), plugin);
    }

    /// Retrieve a plugin by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn RewritePlugin>> {
        self.plugins.get(id).cloned()
    }

    /// Returns the list of registered plugin identifiers.
    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.plugins.keys().copied()
    }

    /// Capabilities for a registered plugin.
    #[must_use]
    pub fn capabilities(&self, id: &str) -> Option<PluginCapabilities> {
        self.plugins.get(id).map(|plugin| plugin.capabilities())
    }

    /// Summaries for every registered plugin, sorted by id.
    #[must_use]
    pub fn summaries(&self) -> Vec<PluginSummary> {
        let mut summaries: Vec<PluginSummary> = self
            .plugins
            .values()
            .map(|plugin| PluginSummary {
                id: plugin.id().to_string(),
                label: plugin.label().to_string(),
                capabilities: plugin.capabilities(),
            })
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }
}
