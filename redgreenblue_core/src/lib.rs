//! Core library for RedGreenBlue's AI rewrite review workflow.
//!
//! The crate is layered around four responsibilities:
//! - line-level diffing of a suggestion against the document
//! - per-group accept/reject resolution of the resulting changes
//! - the document store, its editing/review state machine and persistence
//! - orchestration of AI rewrite plugins with progress reporting

#![warn(
    clippy::all,
    clippy::cargo,
    clippy::nursery,
    clippy::pedantic,
    missing_docs
)]
#![cfg_attr(
    not(test),
    deny(
        clippy::dbg_macro,
        clippy::expect_used,
        clippy::panic,
        clippy::print_stderr,
        clippy::print_stdout,
        clippy::todo,
        clippy::unwrap_used
    )
)]

/// Shared data models re-exported from `redgreenblue_api`.
pub mod api {
    pub use redgreenblue_api::*;
}
/// Editor configuration.
pub mod config;
/// Line diffing of suggestions into change groups.
pub mod diff;
/// Document state and the store that owns it.
pub mod document;
/// Rewrite plugin registry and invocation.
pub mod plugins;
/// AI processing progress channel.
pub mod progress;
/// Accept/reject resolution of change groups.
pub mod review;
/// Orchestration of a rewrite request from trigger to review.
pub mod session;
/// Key-value persistence collaborators.
pub mod storage;

pub use api::{
    join_spans, ChangeGroup, DiffResult, ProcessingState, Progress, SpanColor, SpanGroup,
    TextSpan,
};
pub use config::EditorConfig;
pub use diff::{find_change_group_for_span, group_spans_by_change_group, DiffEngine};
pub use document::{DocumentState, DocumentStore};
pub use progress::ProgressStore;
pub use review::{ChangeGroupRegistry, Resolution};
pub use session::{ProcessOutcome, RewriteSession};
pub use storage::{
    DocumentRepository, FileStore, KeyValueStore, MemoryStore, StorageError, StorageResult,
};

/// Common result type for the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the core library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Filesystem interaction failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Filesystem path involved in the failed operation.
        path: String,
        /// Source I/O error returned by the standard library.
        #[source]
        source: std::io::Error,
    },
    /// A stored value could not be encoded or decoded.
    #[error("failed to (de)serialize value for {key}: {source}")]
    Serialization {
        /// Storage key of the value.
        key: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The key-value collaborator failed.
    #[error("storage error for {key}: {source}")]
    Storage {
        /// Storage key involved in the failed operation.
        key: String,
        /// Error reported by the store.
        #[source]
        source: StorageError,
    },
    /// Requested plugin is not registered.
    #[error("plugin '{plugin}' is not registered")]
    PluginNotRegistered {
        /// Identifier of the missing plugin.
        plugin: String,
    },
    /// Plugin operation failed.
    #[error("plugin '{plugin}' failed: {source}")]
    Plugin {
        /// Identifier of the plugin that produced the error.
        plugin: String,
        /// Underlying plugin error.
        #[source]
        source: plugins::PluginError,
    },
    /// A suggestion is already under review.
    #[error("a suggestion is already under review")]
    ReviewInProgress,
    /// The document holds no blue or yellow text to submit.
    #[error("document has no text eligible for AI processing")]
    NothingToProcess,
}
