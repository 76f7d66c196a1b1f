use std::env;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use tracing::warn;

use crate::storage::{DocumentRepository, FileStore};
use crate::Result;

/// Environment variable overriding the persist debounce, in milliseconds.
pub const DEBOUNCE_ENV: &str = "REDGREENBLUE_DEBOUNCE_MS";
/// Environment variable selecting the rewrite plugin.
pub const PLUGIN_ENV: &str = "REDGREENBLUE_PLUGIN";
/// Environment variable pointing at a directory for durable storage.
pub const STORAGE_DIR_ENV: &str = "REDGREENBLUE_STORAGE_DIR";

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);
const DEFAULT_PLUGIN: &str = "mock";

/// Settings shared by the document store and the rewrite session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    /// Quiet period before a persist is written.
    pub debounce: Duration,
    /// Identifier of the rewrite plugin to invoke.
    pub plugin_id: String,
    /// Directory for [`FileStore`]; `None` keeps the document in memory.
    pub storage_dir: Option<Utf8PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            plugin_id: DEFAULT_PLUGIN.to_string(),
            storage_dir: None,
        }
    }
}

impl EditorConfig {
    /// Read overrides from the process environment.
    ///
    /// Invalid values are logged and fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read overrides through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(DEBOUNCE_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(millis) => config.debounce = Duration::from_millis(millis),
                Err(err) => warn!(value = %raw, error = %err, "ignoring invalid debounce"),
            }
        }

        if let Some(raw) = lookup(PLUGIN_ENV) {
            let plugin_id = raw.trim();
            if plugin_id.is_empty() {
                warn!("ignoring empty plugin id");
            } else {
                config.plugin_id = plugin_id.to_string();
            }
        }

        config.storage_dir = lookup(STORAGE_DIR_ENV)
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(Utf8PathBuf::from);

        config
    }

    /// Override the debounce.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Override the rewrite plugin.
    #[must_use]
    pub fn with_plugin(mut self, plugin_id: impl Into<String>) -> Self {
        self.plugin_id = plugin_id.into();
        self
    }

    /// Persist into the given directory.
    #[must_use]
    pub fn with_storage_dir(mut self, storage_dir: impl Into<Utf8PathBuf>) -> Self {
        self.storage_dir = Some(storage_dir.into());
        self
    }

    /// Build the repository the configuration describes.
    ///
    /// # Errors
    ///
    /// Returns an error when the storage directory cannot be created.
    pub fn open_repository(&self) -> Result<DocumentRepository> {
        match &self.storage_dir {
            Some(dir) => Ok(DocumentRepository::new(Arc::new(FileStore::open(
                dir.clone(),
            )?))),
            None => Ok(DocumentRepository::in_memory()),
        }
    }
}
