use serde::{Deserialize, Serialize};

use redgreenblue_api::{SpanColor, TextSpan};

/// Capabilities advertised by a plugin for UI feature toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PluginCapabilities {
    /// Whether the plugin works without network or external processes.
    pub runs_offline: bool,
    /// Whether yellow prompt lines steer the rewrite.
    pub supports_prompt_lines: bool,
}

impl PluginCapabilities {
    /// Construct a new capabilities struct with explicit flags.
    #[must_use]
    pub const fn new(runs_offline: bool, supports_prompt_lines: bool) -> Self {
        Self {
            runs_offline,
            supports_prompt_lines,
        }
    }
}

/// Summary information about a registered plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSummary {
    /// Stable identifier for the plugin.
    pub id: String,
    /// Human-friendly label for display.
    pub label: String,
    /// Capability flags indicating supported flows.
    pub capabilities: PluginCapabilities,
}

/// Text submitted to a rewrite plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RewriteRequest {
    /// Blue and yellow lines joined with newlines.
    pub text: String,
    /// Yellow lines, which the user flagged as instructions.
    #[serde(default)]
    pub prompt_lines: Vec<String>,
}

impl RewriteRequest {
    /// Create a request for raw text without prompt lines.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            prompt_lines: Vec::new(),
        }
    }

    /// Build a request from the document spans.
    ///
    /// Only user-authored (blue and yellow) spans are submitted.
    #[must_use]
    pub fn from_spans(spans: &[TextSpan]) -> Self {
        let submitted: Vec<&TextSpan> = spans
            .iter()
            .filter(|span| span.color.is_user_authored())
            .collect();

        let text = submitted
            .iter()
            .map(|span| span.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let prompt_lines = submitted
            .iter()
            .filter(|span| span.color == SpanColor::Yellow)
            .map(|span| span.text.clone())
            .collect();

        Self { text, prompt_lines }
    }

    /// Whether the request holds only whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Errors surfaced by plugin integrations.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// The backend did not answer in time.
    #[error("rewrite timed out after {seconds}s")]
    Timeout {
        /// Timeout that elapsed.
        seconds: u64,
    },
    /// Generic failure surfaced by the plugin.
    #[error("{message}")]
    Failure {
        /// Human-readable error message.
        message: String,
    },
}

impl PluginError {
    /// Helper to construct a failure from any displayable message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }
}

/// Convenience result alias for plugin operations.
pub type PluginResult<T> = std::result::Result<T, PluginError>;
