use serde::{Deserialize, Serialize};

/// Discrete phases of an AI processing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    /// No request has been started, or the last one was dismissed.
    #[default]
    Idle,
    /// A request is outstanding.
    Processing,
    /// The last request finished and its suggestion is under review.
    Complete,
}

/// Snapshot of the progress channel observed by UI layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Progress {
    /// Current phase.
    pub state: ProcessingState,
    /// Completion estimate between 0 and 100.
    pub progress: u8,
    /// Free-text status line.
    #[serde(default)]
    pub message: String,
}

impl Progress {
    /// Highest value the progress estimate can take.
    pub const MAX: u8 = 100;

    /// Whether a request is currently outstanding.
    #[must_use]
    pub const fn is_processing(&self) -> bool {
        matches!(self.state, ProcessingState::Processing)
    }
}
