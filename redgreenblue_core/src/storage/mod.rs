//! Persistence collaborators behind a minimal key-value contract.

mod debounce;
mod file;
mod memory;
mod repository;

pub use debounce::DebouncedWriter;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use repository::{DocumentRepository, PersistedDocument, DOCUMENT_KEY, TEXT_SPANS_KEY};

/// Convenience result alias for key-value operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Opaque string key-value store the document is persisted into.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Implementors should surface backend failures; a missing key is `Ok(None)`.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Implementors should surface backend failures.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
}

/// Errors surfaced by key-value stores.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem interaction failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// File backing the key.
        path: String,
        /// Source I/O error.
        #[source]
        source: std::io::Error,
    },
    /// In-memory state was poisoned by a panicking writer.
    #[error("storage state poisoned")]
    Poisoned,
    /// Generic backend failure.
    #[error("{message}")]
    Backend {
        /// Human-readable error message.
        message: String,
    },
}

impl StorageError {
    /// Helper to construct a backend failure from any displayable message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for StorageError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::Poisoned
    }
}
