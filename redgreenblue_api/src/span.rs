use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Semantic color attached to every span of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpanColor {
    /// Text typed by the user, eligible for AI processing.
    #[default]
    Blue,
    /// User-authored line flagged as a prompt for the AI.
    Yellow,
    /// Original line superseded by a pending suggestion.
    Red,
    /// Suggested line pending review.
    Green,
    /// Unchanged or resolved text.
    White,
}

impl SpanColor {
    /// Whether the color marks user-authored content sent to the AI.
    #[must_use]
    pub const fn is_user_authored(self) -> bool {
        matches!(self, Self::Blue | Self::Yellow)
    }

    /// Whether the color marks a line that belongs to a pending change group.
    #[must_use]
    pub const fn is_pending_review(self) -> bool {
        matches!(self, Self::Red | Self::Green)
    }

    /// The color a user toggle produces, if the color is toggleable at all.
    ///
    /// Only blue and yellow swap; review colors change through accept/reject.
    #[must_use]
    pub const fn toggled(self) -> Option<Self> {
        match self {
            Self::Blue => Some(Self::Yellow),
            Self::Yellow => Some(Self::Blue),
            Self::Red | Self::Green | Self::White => None,
        }
    }
}

/// One line of document text tagged with a semantic color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSpan {
    /// Identifier unique within the span sequence.
    pub id: String,
    /// Line content without the trailing newline.
    pub text: String,
    /// Semantic color of the line.
    #[serde(default)]
    pub color: SpanColor,
    /// Change group the line belongs to while a review is pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_group_id: Option<String>,
}

impl TextSpan {
    /// Create a span with a freshly generated identifier.
    pub fn new(text: impl Into<String>, color: SpanColor) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            color,
            change_group_id: None,
        }
    }

    /// Create a red or green span owned by a change group.
    pub fn pending(text: impl Into<String>, color: SpanColor, group_id: impl Into<String>) -> Self {
        Self {
            change_group_id: Some(group_id.into()),
            ..Self::new(text, color)
        }
    }

    /// Whether the span references the given change group.
    #[must_use]
    pub fn belongs_to(&self, group_id: &str) -> bool {
        self.change_group_id.as_deref() == Some(group_id)
    }

    /// Whether the color and change group reference agree with each other.
    ///
    /// Red and green spans must carry a group id; every other color must not.
    #[must_use]
    pub const fn has_legal_color(&self) -> bool {
        self.color.is_pending_review() == self.change_group_id.is_some()
    }
}

/// Join span texts with newline separators, the document's canonical text form.
#[must_use]
pub fn join_spans(spans: &[TextSpan]) -> String {
    spans
        .iter()
        .map(|span| span.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
