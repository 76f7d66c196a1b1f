//! Accept/reject resolution of pending change groups.

use tracing::debug;

use crate::api::{ChangeGroup, SpanColor, TextSpan};

/// Spans and groups after resolving one change group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Updated document spans.
    pub text_spans: Vec<TextSpan>,
    /// Groups still pending after the resolution.
    pub change_groups: Vec<ChangeGroup>,
}

impl Resolution {
    /// Whether no group remains pending.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.change_groups.is_empty()
    }
}

/// Read-only view over the pending groups of a review.
///
/// Resolving a group never mutates in place; it returns a [`Resolution`]
/// describing the next spans and groups. Unknown group ids resolve to `None`,
/// which callers treat as a no-op.
#[derive(Debug, Clone, Copy)]
pub struct ChangeGroupRegistry<'a> {
    change_groups: &'a [ChangeGroup],
}

impl<'a> ChangeGroupRegistry<'a> {
    /// Construct a registry over the given pending groups.
    #[must_use]
    pub const fn new(change_groups: &'a [ChangeGroup]) -> Self {
        Self { change_groups }
    }

    /// Look up a pending group.
    #[must_use]
    pub fn get(&self, group_id: &str) -> Option<&'a ChangeGroup> {
        self.change_groups.iter().find(|group| group.id == group_id)
    }

    /// Keep the suggestion: drop the group's red lines and settle its green lines as white.
    #[must_use]
    pub fn accept(&self, spans: &[TextSpan], group_id: &str) -> Option<Resolution> {
        self.get(group_id)?;

        let text_spans = spans
            .iter()
            .filter(|span| !(span.belongs_to(group_id) && span.color == SpanColor::Red))
            .map(|span| {
                if span.belongs_to(group_id) {
                    settle(span, SpanColor::White)
                } else {
                    span.clone()
                }
            })
            .collect();

        debug!(group = group_id, "accepted change group");
        Some(self.without(group_id, text_spans))
    }

    /// Keep the original: drop the group's green lines and restore its red lines.
    ///
    /// A restored line takes the color of the first original span with the
    /// same text, or blue when none matches. Duplicate lines with different
    /// original colors are therefore ambiguous.
    #[must_use]
    pub fn reject(
        &self,
        spans: &[TextSpan],
        group_id: &str,
        original_spans: &[TextSpan],
    ) -> Option<Resolution> {
        self.get(group_id)?;

        let text_spans = spans
            .iter()
            .filter(|span| !(span.belongs_to(group_id) && span.color == SpanColor::Green))
            .map(|span| {
                if span.belongs_to(group_id) {
                    settle(span, original_color(original_spans, &span.text))
                } else {
                    span.clone()
                }
            })
            .collect();

        debug!(group = group_id, "rejected change group");
        Some(self.without(group_id, text_spans))
    }

    fn without(&self, group_id: &str, text_spans: Vec<TextSpan>) -> Resolution {
        Resolution {
            text_spans,
            change_groups: self
                .change_groups
                .iter()
                .filter(|group| group.id != group_id)
                .cloned()
                .collect(),
        }
    }
}

/// Settle spans left behind by a review that never finished.
///
/// Suggested lines are dropped and superseded lines come back as blue text,
/// so the result satisfies the color rules of an editing document.
#[must_use]
pub fn discard_pending(spans: Vec<TextSpan>) -> Vec<TextSpan> {
    spans
        .into_iter()
        .filter(|span| span.color != SpanColor::Green)
        .map(|mut span| {
            if span.color == SpanColor::Red {
                span.color = SpanColor::Blue;
            }
            span.change_group_id = None;
            span
        })
        .collect()
}

fn settle(span: &TextSpan, color: SpanColor) -> TextSpan {
    TextSpan {
        color,
        change_group_id: None,
        ..span.clone()
    }
}

fn original_color(original_spans: &[TextSpan], text: &str) -> SpanColor {
    original_spans
        .iter()
        .find(|span| span.text == text)
        .map(|span| span.color)
        .filter(|color| !color.is_pending_review())
        .unwrap_or(SpanColor::Blue)
}
