use std::pin::pin;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use crate::config::EditorConfig;
use crate::diff::DiffEngine;
use crate::document::DocumentStore;
use crate::plugins::{default_registry, PluginService, RewriteRequest};
use crate::progress::ProgressStore;
use crate::{Error, Result};

const DEFAULT_TICK: Duration = Duration::from_millis(200);
const MIN_TICK: Duration = Duration::from_millis(1);
const PROGRESS_STEP: u8 = 10;
const PROGRESS_CEILING: u8 = 90;

/// Result of a successful rewrite request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Number of change groups the suggestion produced.
    pub change_groups: usize,
    /// Whether the document switched to review mode.
    pub entered_review: bool,
}

/// Drives one rewrite request from trigger to review.
///
/// The session owns handles to the plugin service and the progress channel
/// and borrows the document store only for the duration of a request, so the
/// two state containers never reference each other.
#[derive(Debug, Clone)]
pub struct RewriteSession {
    plugins: PluginService,
    progress: ProgressStore,
    plugin_id: String,
    diff_engine: DiffEngine,
    tick: Duration,
}

impl RewriteSession {
    /// Create a session invoking `plugin_id` from the given service.
    pub fn new(plugins: PluginService, progress: ProgressStore, plugin_id: impl Into<String>) -> Self {
        Self {
            plugins,
            progress,
            plugin_id: plugin_id.into(),
            diff_engine: DiffEngine::new(),
            tick: DEFAULT_TICK,
        }
    }

    /// Session over the default plugins, using the configured plugin.
    #[must_use]
    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(
            PluginService::new(default_registry()),
            ProgressStore::new(),
            config.plugin_id.clone(),
        )
    }

    /// Override how often progress advances while waiting on the plugin.
    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Progress channel updated by this session.
    #[must_use]
    pub const fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    /// Plugins available to the session.
    #[must_use]
    pub const fn plugins(&self) -> &PluginService {
        &self.plugins
    }

    /// Identifier of the plugin requests are sent to.
    #[must_use]
    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Submit the blue and yellow lines of the document and review the answer.
    ///
    /// Only the submitted lines are diffed against the answer; resolved white
    /// lines stay where they are and never join a change group. The snapshot
    /// of every span taken before the request becomes the review's original
    /// spans.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReviewInProgress`] while a suggestion is under review,
    /// [`Error::NothingToProcess`] when no blue or yellow text exists, and
    /// plugin errors after resetting the progress channel.
    pub async fn process_with_ai(&self, store: &mut DocumentStore) -> Result<ProcessOutcome> {
        if store.is_diff_mode() {
            return Err(Error::ReviewInProgress);
        }
        if !store.has_processable_text() {
            return Err(Error::NothingToProcess);
        }

        let original_spans = store.text_spans().to_vec();
        let request = RewriteRequest::from_spans(&original_spans);

        self.progress.start_processing();
        let replacement = match self.rewrite_with_progress(request).await {
            Ok(replacement) => replacement,
            Err(err) => {
                warn!(plugin = %self.plugin_id, error = %err, "rewrite failed");
                self.progress.reset_processing();
                return Err(err);
            }
        };

        let diff = self
            .diff_engine
            .compute_submitted_change_groups(&original_spans, &replacement);
        let change_groups = diff.change_groups.len();
        let entered_review = store.enter_diff_mode(diff, original_spans);
        self.progress.complete_processing();

        info!(
            plugin = %self.plugin_id,
            change_groups,
            entered_review,
            "rewrite ready for review"
        );
        Ok(ProcessOutcome {
            change_groups,
            entered_review,
        })
    }

    async fn rewrite_with_progress(&self, request: RewriteRequest) -> Result<String> {
        let mut rewrite = pin!(self.plugins.rewrite(&self.plugin_id, request));
        let tick = self.tick.max(MIN_TICK);
        let mut ticker = time::interval_at(time::Instant::now() + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                result = &mut rewrite => return result,
                _ = ticker.tick() => self.advance(),
            }
        }
    }

    fn advance(&self) {
        let current = self.progress.current().progress;
        if current >= PROGRESS_CEILING {
            return;
        }
        let next = current.saturating_add(PROGRESS_STEP).min(PROGRESS_CEILING);
        self.progress.set_progress(next);
        self.progress.set_message(stage_message(next));
    }
}

const fn stage_message(progress: u8) -> &'static str {
    match progress {
        0..=29 => "Analyzing text...",
        30..=59 => "Generating suggestions...",
        _ => "Finalizing changes...",
    }
}
