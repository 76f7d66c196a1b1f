use serde::Serialize;

use crate::api::{join_spans, ChangeGroup, TextSpan};
use crate::review::Resolution;
use crate::storage::PersistedDocument;

/// Snapshot of the document observed by UI layers.
///
/// Fields are private so the derived text can never drift from the spans:
/// every transition that replaces spans recomputes it, and review mode is
/// entered and left together with its groups and original spans.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentState {
    text: String,
    text_spans: Vec<TextSpan>,
    original_spans: Vec<TextSpan>,
    change_groups: Vec<ChangeGroup>,
    is_diff_mode: bool,
}

impl DocumentState {
    /// Editing state holding the given spans.
    #[must_use]
    pub fn with_spans(text_spans: Vec<TextSpan>) -> Self {
        let mut state = Self::default();
        state.replace_spans(text_spans);
        state
    }

    /// Newline join of the span texts.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Spans in document order.
    #[must_use]
    pub fn text_spans(&self) -> &[TextSpan] {
        &self.text_spans
    }

    /// Spans as they were before the suggestion; empty outside review.
    #[must_use]
    pub fn original_spans(&self) -> &[TextSpan] {
        &self.original_spans
    }

    /// Groups still pending review.
    #[must_use]
    pub fn change_groups(&self) -> &[ChangeGroup] {
        &self.change_groups
    }

    /// Whether a suggestion is under review.
    #[must_use]
    pub const fn is_diff_mode(&self) -> bool {
        self.is_diff_mode
    }

    /// Check the structural invariants of the state.
    ///
    /// The text equals the span join, review mode coincides with pending
    /// groups, and only red and green spans reference a group.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.text == join_spans(&self.text_spans)
            && self.is_diff_mode == !self.change_groups.is_empty()
            && (self.is_diff_mode || self.original_spans.is_empty())
            && self.text_spans.iter().all(TextSpan::has_legal_color)
    }

    pub(crate) fn snapshot(&self) -> PersistedDocument {
        PersistedDocument {
            text: self.text.clone(),
            spans: self.text_spans.clone(),
        }
    }

    pub(crate) fn replace_spans(&mut self, text_spans: Vec<TextSpan>) {
        self.text = join_spans(&text_spans);
        self.text_spans = text_spans;
    }

    pub(crate) fn edit_spans<R>(&mut self, edit: impl FnOnce(&mut Vec<TextSpan>) -> R) -> R {
        let result = edit(&mut self.text_spans);
        self.text = join_spans(&self.text_spans);
        result
    }

    pub(crate) fn begin_review(
        &mut self,
        diff_spans: Vec<TextSpan>,
        change_groups: Vec<ChangeGroup>,
        original_spans: Vec<TextSpan>,
    ) {
        self.replace_spans(diff_spans);
        self.is_diff_mode = !change_groups.is_empty();
        self.change_groups = change_groups;
        self.original_spans = original_spans;
    }

    /// Apply a resolved group; returns whether review mode ended.
    pub(crate) fn apply_resolution(&mut self, resolution: Resolution) -> bool {
        let exhausted = resolution.is_exhausted();
        self.replace_spans(resolution.text_spans);
        self.change_groups = resolution.change_groups;
        if exhausted {
            self.end_review();
        }
        exhausted
    }

    pub(crate) fn end_review(&mut self) {
        self.change_groups.clear();
        self.original_spans.clear();
        self.is_diff_mode = false;
    }
}
