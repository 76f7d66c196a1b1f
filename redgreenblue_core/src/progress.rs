use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::api::{ProcessingState, Progress};

const PREPARING_MESSAGE: &str = "Preparing AI processing...";
const COMPLETE_MESSAGE: &str = "Processing complete!";

/// Observable progress of the current AI request.
///
/// Cloning yields another handle to the same channel; the document store is
/// never touched from here.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    sender: Arc<watch::Sender<Progress>>,
}

impl Default for ProgressStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressStore {
    /// Create an idle progress channel.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Progress::default());
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Observe every subsequent progress update.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.sender.subscribe()
    }

    /// Latest progress snapshot.
    #[must_use]
    pub fn current(&self) -> Progress {
        self.sender.borrow().clone()
    }

    /// Enter the processing state at zero.
    pub fn start_processing(&self) {
        self.replace(ProcessingState::Processing, 0, PREPARING_MESSAGE);
    }

    /// Mark the request complete at full progress.
    pub fn complete_processing(&self) {
        self.replace(ProcessingState::Complete, Progress::MAX, COMPLETE_MESSAGE);
    }

    /// Return to idle, clearing the message.
    pub fn reset_processing(&self) {
        self.replace(ProcessingState::Idle, 0, "");
    }

    /// Update the completion estimate, clamped to 100.
    pub fn set_progress(&self, progress: u8) {
        let progress = progress.min(Progress::MAX);
        self.sender.send_modify(|current| current.progress = progress);
    }

    /// Update the status line.
    pub fn set_message(&self, message: impl Into<String>) {
        let message = message.into();
        self.sender.send_modify(|current| current.message = message);
    }

    fn replace(&self, state: ProcessingState, progress: u8, message: &str) {
        debug!(?state, progress, "progress transition");
        self.sender.send_replace(Progress {
            state,
            progress,
            message: message.to_string(),
        });
    }
}
