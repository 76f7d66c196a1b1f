//! Rewrite plugin entry points.

mod service;

pub use redgreenblue_plugin_api::{
    PluginCapabilities, PluginError, PluginRegistry, PluginResult, PluginSummary, RewritePlugin,
    RewriteRequest,
};
pub use redgreenblue_plugins::{default_registry, CommandRewriter, MockRewriter};

pub use service::PluginService;
