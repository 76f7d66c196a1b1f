mod command;
mod mock;

pub use command::CommandRewriter;
pub use mock::MockRewriter;

use redgreenblue_plugin_api::PluginRegistry;

/// Build a plugin registry populated with the default rewrite integrations.
#[must_use]
pub fn default_registry() -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    registry.register(MockRewriter::default());
    registry.register(CommandRewriter::default());
    registry
}
