//! Shared RedGreenBlue data models consumed by the core library and plugin crates.
//!
//! The structures in this crate are designed to be:
//! - serializable via `serde` for persistence and transport
//! - plain data, so UI layers can render them without touching core logic

/// Change groups and diff results produced by the diff engine.
pub mod change;
/// AI processing progress reported to observers.
pub mod progress;
/// Colored text spans, the atomic unit of document content.
pub mod span;

pub use change::{ChangeGroup, DiffResult, SpanGroup};
pub use progress::{ProcessingState, Progress};
pub use span::{join_spans, SpanColor, TextSpan};
