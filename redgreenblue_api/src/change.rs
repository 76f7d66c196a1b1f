use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::span::TextSpan;

/// A contiguous cluster of removed and added lines resolvable as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeGroup {
    /// Identifier referenced by the group's red and green spans.
    pub id: String,
    /// Original lines the suggestion drops, in original order.
    #[serde(default)]
    pub removed_lines: Vec<String>,
    /// Suggested lines, in replacement order.
    #[serde(default)]
    pub added_lines: Vec<String>,
    /// Offset of the group's first line within the merged line sequence.
    #[serde(default)]
    pub start_line_index: usize,
}

impl ChangeGroup {
    /// Create an empty group starting at the given merged line offset.
    pub fn new(id: impl Into<String>, start_line_index: usize) -> Self {
        Self {
            id: id.into(),
            removed_lines: Vec::new(),
            added_lines: Vec::new(),
            start_line_index,
        }
    }

    /// Create an empty group with a freshly generated identifier.
    #[must_use]
    pub fn starting_at(start_line_index: usize) -> Self {
        Self::new(format!("change-{}", Uuid::new_v4()), start_line_index)
    }

    /// Whether the group neither removes nor adds anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.removed_lines.is_empty() && self.added_lines.is_empty()
    }
}

/// Output of the diff engine: pending groups plus the annotated span sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    /// Groups in document order.
    #[serde(default)]
    pub change_groups: Vec<ChangeGroup>,
    /// Red, green and white spans in hunk order.
    #[serde(default)]
    pub diff_spans: Vec<TextSpan>,
}

impl DiffResult {
    /// Whether the diff produced no change groups at all.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.change_groups.is_empty()
    }
}

/// Consecutive spans sharing the same change group (or none), for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanGroup {
    /// Group the spans belong to, `None` for unchanged text.
    #[serde(default)]
    pub change_group: Option<ChangeGroup>,
    /// Spans in document order.
    #[serde(default)]
    pub spans: Vec<TextSpan>,
}
