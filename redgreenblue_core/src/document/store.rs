use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use super::DocumentState;
use crate::api::{ChangeGroup, DiffResult, SpanColor, SpanGroup, TextSpan};
use crate::config::EditorConfig;
use crate::diff::group_spans_by_change_group;
use crate::review::{discard_pending, ChangeGroupRegistry};
use crate::storage::{DebouncedWriter, DocumentRepository};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Accept,
    Reject,
}

/// Single owner of the document, switching between editing and review.
///
/// Every mutation that changes the spans recomputes the text, publishes the
/// new [`DocumentState`] to subscribers and schedules a debounced persist.
/// Leaving review mode persists immediately. Editing operations are refused
/// while a review is pending; unknown span or group ids are no-ops.
#[derive(Debug)]
pub struct DocumentStore {
    state: DocumentState,
    sender: watch::Sender<DocumentState>,
    repository: DocumentRepository,
    writer: DebouncedWriter,
}

impl DocumentStore {
    /// Create an empty document persisted through `repository`.
    #[must_use]
    pub fn new(repository: DocumentRepository, debounce: Duration) -> Self {
        Self::with_state(DocumentState::default(), repository, debounce)
    }

    /// Restore the document last persisted through `repository`.
    ///
    /// Spans left red or green by an interrupted review are settled as if
    /// rejected. Without stored spans the stored text is split into blue lines.
    #[must_use]
    pub fn open(repository: DocumentRepository, debounce: Duration) -> Self {
        let spans = match repository.load_text_spans() {
            Some(spans) => settle_spans(spans),
            None => repository
                .load_document()
                .map(|text| spans_from_text(&text, |_| None))
                .unwrap_or_default(),
        };
        debug!(spans = spans.len(), "opened document");
        Self::with_state(DocumentState::with_spans(spans), repository, debounce)
    }

    /// Open the document described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error when the configured storage cannot be opened.
    pub fn from_config(config: &EditorConfig) -> Result<Self> {
        let repository = config.open_repository()?;
        Ok(Self::open(repository, config.debounce))
    }

    fn with_state(state: DocumentState, repository: DocumentRepository, debounce: Duration) -> Self {
        let (sender, _) = watch::channel(state.clone());
        Self {
            state,
            sender,
            repository,
            writer: DebouncedWriter::new(debounce),
        }
    }

    /// Observe every subsequent state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DocumentState> {
        self.sender.subscribe()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &DocumentState {
        &self.state
    }

    /// Newline join of the spans.
    #[must_use]
    pub fn text(&self) -> &str {
        self.state.text()
    }

    /// Spans in document order.
    #[must_use]
    pub fn text_spans(&self) -> &[TextSpan] {
        self.state.text_spans()
    }

    /// Groups pending review.
    #[must_use]
    pub fn change_groups(&self) -> &[ChangeGroup] {
        self.state.change_groups()
    }

    /// Whether a suggestion is under review.
    #[must_use]
    pub const fn is_diff_mode(&self) -> bool {
        self.state.is_diff_mode()
    }

    /// Spans partitioned by pending change group, for rendering.
    #[must_use]
    pub fn span_groups(&self) -> Vec<SpanGroup> {
        group_spans_by_change_group(self.state.text_spans(), self.state.change_groups())
    }

    /// Whether some blue or yellow span holds non-blank text.
    #[must_use]
    pub fn has_processable_text(&self) -> bool {
        self.state
            .text_spans()
            .iter()
            .any(|span| span.color.is_user_authored() && !span.text.trim().is_empty())
    }

    /// Replace every span.
    ///
    /// Red and green spans are settled the same way as on load, so the
    /// editing document never carries review colors. Text with embedded
    /// newlines continues in following spans of the same color, and repeated
    /// ids are replaced with fresh ones.
    pub fn set_text_spans(&mut self, spans: Vec<TextSpan>) -> bool {
        if self.refuse_edit("set_text_spans") {
            return false;
        }
        self.state.replace_spans(settle_spans(spans));
        self.changed();
        true
    }

    /// Rebuild the spans from plain text, one per line.
    ///
    /// A line keeps the id and color of the span previously at its index when
    /// that span was blue or yellow; every other line becomes a new blue span.
    pub fn set_text(&mut self, text: &str) -> bool {
        if self.refuse_edit("set_text") {
            return false;
        }
        let spans = spans_from_text(text, |index| {
            self.state
                .text_spans()
                .get(index)
                .filter(|span| span.color.is_user_authored())
        });
        self.state.replace_spans(spans);
        self.changed();
        true
    }

    /// Append a line, returning the id of the new span.
    ///
    /// Returns `None` during review or when `color` is a review color.
    pub fn add_text_span(&mut self, text: &str, color: SpanColor) -> Option<String> {
        if self.refuse_edit("add_text_span") || color.is_pending_review() {
            return None;
        }
        let mut lines = text.split('\n');
        let first = TextSpan::new(lines.next().unwrap_or_default(), color);
        let id = first.id.clone();
        self.state.edit_spans(|spans| {
            spans.push(first);
            spans.extend(lines.map(|line| TextSpan::new(line, color)));
        });
        self.changed();
        Some(id)
    }

    /// Replace the text of a span.
    ///
    /// Embedded newlines split the text into following spans of the same color.
    pub fn update_span_text(&mut self, span_id: &str, text: &str) -> bool {
        if self.refuse_edit("update_span_text") {
            return false;
        }
        let Some(index) = self.position(span_id) else {
            return false;
        };
        self.state.edit_spans(|spans| {
            let mut lines = text.split('\n');
            let span = &mut spans[index];
            span.text = lines.next().unwrap_or_default().to_string();
            let color = span.color;
            let tail: Vec<TextSpan> = lines.map(|line| TextSpan::new(line, color)).collect();
            let rest = spans.split_off(index + 1);
            spans.extend(tail);
            spans.extend(rest);
        });
        self.changed();
        true
    }

    /// Split a span at a character offset, returning the id of the new span.
    ///
    /// The new span holds the text after the cursor and keeps a blue or
    /// yellow color; other colors continue as blue. Offsets past the end
    /// split after the last character.
    pub fn split_span(&mut self, span_id: &str, cursor: usize) -> Option<String> {
        if self.refuse_edit("split_span") {
            return None;
        }
        let index = self.position(span_id)?;
        let id = self.state.edit_spans(|spans| {
            let span = &mut spans[index];
            let at = byte_offset(&span.text, cursor);
            let tail = span.text.split_off(at);
            let color = if span.color.is_user_authored() {
                span.color
            } else {
                SpanColor::Blue
            };
            let next = TextSpan::new(tail, color);
            let id = next.id.clone();
            spans.insert(index + 1, next);
            id
        });
        self.changed();
        Some(id)
    }

    /// Join a span onto the one before it, returning the cursor position
    /// at the seam in characters.
    ///
    /// The first span has nothing to merge into and is left alone.
    pub fn merge_with_previous(&mut self, span_id: &str) -> Option<usize> {
        if self.refuse_edit("merge_with_previous") {
            return None;
        }
        let index = self.position(span_id).filter(|index| *index > 0)?;
        let cursor = self.state.edit_spans(|spans| {
            let merged = spans.remove(index);
            let previous = &mut spans[index - 1];
            let cursor = previous.text.chars().count();
            previous.text.push_str(&merged.text);
            cursor
        });
        self.changed();
        Some(cursor)
    }

    /// Delete a span.
    pub fn remove_span(&mut self, span_id: &str) -> bool {
        if self.refuse_edit("remove_span") {
            return false;
        }
        let Some(index) = self.position(span_id) else {
            return false;
        };
        self.state.edit_spans(|spans| spans.remove(index));
        self.changed();
        true
    }

    /// Swap a span between blue and yellow.
    pub fn toggle_span_color(&mut self, span_id: &str) -> bool {
        if self.refuse_edit("toggle_span_color") {
            return false;
        }
        let Some(index) = self.position(span_id) else {
            return false;
        };
        let Some(color) = self.state.text_spans()[index].color.toggled() else {
            return false;
        };
        self.state.edit_spans(|spans| spans[index].color = color);
        self.changed();
        true
    }

    /// Start reviewing a suggestion.
    ///
    /// `original_spans` are the spans the diff was computed from; rejected
    /// lines recover their colors from them. A diff without change groups
    /// leaves the document untouched and returns `false`, as does a call
    /// while another review is pending.
    pub fn enter_diff_mode(&mut self, diff: DiffResult, original_spans: Vec<TextSpan>) -> bool {
        if self.state.is_diff_mode() {
            debug!("already reviewing, ignoring suggestion");
            return false;
        }
        if diff.is_unchanged() {
            debug!("suggestion matches the document, nothing to review");
            return false;
        }

        info!(groups = diff.change_groups.len(), "entering review");
        self.state
            .begin_review(diff.diff_spans, diff.change_groups, original_spans);
        self.changed();
        true
    }

    /// Keep the suggested lines of one group.
    pub fn accept_change_group(&mut self, group_id: &str) -> bool {
        self.resolve(&[group_id], Verdict::Accept) > 0
    }

    /// Keep the original lines of one group.
    pub fn reject_change_group(&mut self, group_id: &str) -> bool {
        self.resolve(&[group_id], Verdict::Reject) > 0
    }

    /// Accept every pending group, returning how many were resolved.
    pub fn accept_all(&mut self) -> usize {
        let ids = self.pending_ids();
        self.resolve(&ids, Verdict::Accept)
    }

    /// Reject every pending group, returning how many were resolved.
    pub fn reject_all(&mut self) -> usize {
        let ids = self.pending_ids();
        self.resolve(&ids, Verdict::Reject)
    }

    /// Leave review mode, rejecting any group still pending.
    pub fn exit_diff_mode(&mut self) -> bool {
        if !self.state.is_diff_mode() {
            return false;
        }
        self.reject_all();
        if self.state.is_diff_mode() {
            self.state.end_review();
            self.finish_review();
        }
        true
    }

    /// Write the current state now instead of waiting for the debounce.
    pub fn flush(&mut self) {
        self.writer
            .write_now(&self.repository, &self.state.snapshot());
    }

    /// Whether a debounced write has not fired yet.
    #[must_use]
    pub fn has_pending_write(&self) -> bool {
        self.writer.is_pending()
    }

    fn resolve<S: AsRef<str>>(&mut self, group_ids: &[S], verdict: Verdict) -> usize {
        if !self.state.is_diff_mode() {
            return 0;
        }

        let mut resolved = 0;
        let mut finished = false;
        for group_id in group_ids.iter().map(AsRef::as_ref) {
            let registry = ChangeGroupRegistry::new(self.state.change_groups());
            let resolution = match verdict {
                Verdict::Accept => registry.accept(self.state.text_spans(), group_id),
                Verdict::Reject => registry.reject(
                    self.state.text_spans(),
                    group_id,
                    self.state.original_spans(),
                ),
            };
            let Some(resolution) = resolution else {
                debug!(group = group_id, "unknown change group, ignoring");
                continue;
            };
            resolved += 1;
            finished = self.state.apply_resolution(resolution);
            if finished {
                break;
            }
        }

        if finished {
            self.finish_review();
        } else if resolved > 0 {
            self.changed();
        }
        resolved
    }

    fn pending_ids(&self) -> Vec<String> {
        self.state
            .change_groups()
            .iter()
            .map(|group| group.id.clone())
            .collect()
    }

    fn finish_review(&mut self) {
        info!(spans = self.state.text_spans().len(), "review finished");
        self.publish();
        self.flush();
    }

    fn changed(&mut self) {
        self.publish();
        self.writer
            .schedule(&self.repository, self.state.snapshot());
    }

    fn publish(&self) {
        self.sender.send_replace(self.state.clone());
    }

    fn position(&self, span_id: &str) -> Option<usize> {
        let index = self
            .state
            .text_spans()
            .iter()
            .position(|span| span.id == span_id);
        if index.is_none() {
            debug!(span = span_id, "unknown span, ignoring edit");
        }
        index
    }

    fn refuse_edit(&self, operation: &str) -> bool {
        let refused = self.state.is_diff_mode();
        if refused {
            debug!(operation, "edit refused during review");
        }
        refused
    }
}

fn spans_from_text<'a>(
    text: &str,
    previous: impl Fn(usize) -> Option<&'a TextSpan>,
) -> Vec<TextSpan> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split('\n')
        .enumerate()
        .map(|(index, line)| match previous(index) {
            Some(span) => TextSpan {
                id: span.id.clone(),
                text: line.to_string(),
                color: span.color,
                change_group_id: None,
            },
            None => TextSpan::new(line, SpanColor::Blue),
        })
        .collect()
}

/// One line per span, unique ids, no review colors.
fn settle_spans(spans: Vec<TextSpan>) -> Vec<TextSpan> {
    let mut seen = HashSet::with_capacity(spans.len());
    let mut settled = Vec::with_capacity(spans.len());

    for mut span in discard_pending(spans) {
        if !seen.insert(span.id.clone()) {
            let fresh = TextSpan::new(String::new(), span.color);
            debug!(id = %span.id, fresh = %fresh.id, "replacing duplicate span id");
            span.id = fresh.id;
            seen.insert(span.id.clone());
        }

        let Some(newline) = span.text.find('\n') else {
            settled.push(span);
            continue;
        };
        let rest = span.text.split_off(newline);
        let tail: Vec<TextSpan> = rest
            .split('\n')
            .skip(1)
            .map(|line| TextSpan::new(line, span.color))
            .collect();
        seen.extend(tail.iter().map(|line| line.id.clone()));
        settled.push(span);
        settled.extend(tail);
    }

    settled
}

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map_or(text.len(), |(offset, _)| offset)
}
