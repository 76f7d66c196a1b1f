//! Interfaces implemented by AI rewrite integrations.

mod registry;
mod types;

use async_trait::async_trait;

pub use registry::PluginRegistry;
pub use types::{
    PluginCapabilities, PluginError, PluginResult, PluginSummary, RewriteRequest,
};

/// Trait implemented by AI rewrite backends (local mocks, external CLIs).
#[async_trait]
pub trait RewritePlugin: Send + Sync {
    /// Stable identifier used for lookup and logging.
    fn id(&self) -> &'static str;

    /// Human-friendly label for UI surfaces.
    fn label(&self) -> &'static str;

    /// Capabilities advertised by the plugin.
    fn capabilities(&self) -> PluginCapabilities;

    /// Produce the full replacement text for the submitted region.
    ///
    /// The returned text replaces the whole request, it is not a diff.
    ///
    /// # Errors
    ///
    /// Implementors should surface any transport or backend failures.
    async fn rewrite(&self, request: RewriteRequest) -> PluginResult<String>;
}
