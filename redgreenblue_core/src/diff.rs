//! Line-level diffing of an AI suggestion against the document spans.
//!
//! The engine runs a Myers diff over lines and folds the resulting hunks into
//! [`ChangeGroup`]s: every run of removed/added hunks uninterrupted by an
//! unchanged hunk becomes one independently resolvable group.

use similar::{capture_diff_slices, Algorithm, DiffTag};
use tracing::debug;

use crate::api::{join_spans, ChangeGroup, DiffResult, SpanColor, SpanGroup, TextSpan};

/// Entry point for diff generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffEngine;

impl DiffEngine {
    /// Construct a new diff engine instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Diff `original_spans` against `replacement_text` and build change groups.
    ///
    /// Removed lines become red spans and added lines green spans, both tagged
    /// with their group id; unchanged lines become white spans. The function is
    /// total: identical input yields no groups and an all-white span sequence.
    #[must_use]
    pub fn compute_change_groups(
        &self,
        original_spans: &[TextSpan],
        replacement_text: &str,
    ) -> DiffResult {
        let original_text = join_spans(original_spans);
        let original_lines = split_lines(&original_text);
        let replacement_lines = split_lines(replacement_text);

        let mut change_groups = Vec::new();
        let mut diff_spans = Vec::with_capacity(original_lines.len() + replacement_lines.len());
        let mut open: Option<ChangeGroup> = None;
        let mut line_index = 0;

        for hunk in hunks(&original_lines, &replacement_lines) {
            if hunk.lines.is_empty() {
                continue;
            }

            match hunk.kind {
                HunkKind::Unchanged => {
                    if let Some(group) = open.take() {
                        change_groups.push(group);
                    }
                    diff_spans.extend(
                        hunk.lines
                            .iter()
                            .map(|line| TextSpan::new(*line, SpanColor::White)),
                    );
                }
                HunkKind::Removed | HunkKind::Added => {
                    let group = open.get_or_insert_with(|| ChangeGroup::starting_at(line_index));
                    let (color, target) = if hunk.kind == HunkKind::Removed {
                        (SpanColor::Red, &mut group.removed_lines)
                    } else {
                        (SpanColor::Green, &mut group.added_lines)
                    };
                    target.extend(hunk.lines.iter().map(|line| (*line).to_string()));
                    diff_spans.extend(
                        hunk.lines
                            .iter()
                            .map(|line| TextSpan::pending(*line, color, group.id.clone())),
                    );
                }
            }

            line_index += hunk.lines.len();
        }

        if let Some(group) = open {
            change_groups.push(group);
        }

        debug!(
            groups = change_groups.len(),
            spans = diff_spans.len(),
            "computed change groups"
        );

        DiffResult {
            change_groups,
            diff_spans,
        }
    }

    /// Diff only the user-authored spans against `replacement_text`.
    ///
    /// The replacement answers the blue and yellow lines alone, so every other
    /// span keeps its identity and its position relative to the submitted
    /// lines in the merged sequence, outside any change group. Group start
    /// indices are offsets into that merged sequence.
    #[must_use]
    pub fn compute_submitted_change_groups(
        &self,
        spans: &[TextSpan],
        replacement_text: &str,
    ) -> DiffResult {
        let mut submitted = Vec::with_capacity(spans.len());
        // held[k] holds the untouched spans that precede submitted line k.
        let mut held: Vec<Vec<TextSpan>> = vec![Vec::new()];
        for span in spans {
            if span.color.is_user_authored() {
                submitted.push(span.clone());
                held.push(Vec::new());
            } else if let Some(bucket) = held.last_mut() {
                bucket.push(span.clone());
            }
        }

        let result = self.compute_change_groups(&submitted, replacement_text);
        if submitted.len() == spans.len() {
            return result;
        }

        let DiffResult {
            mut change_groups,
            diff_spans,
        } = result;
        let mut merged = Vec::with_capacity(spans.len() + diff_spans.len());
        let mut consumed = 0;
        for span in diff_spans {
            if span.color != SpanColor::Green {
                if let Some(bucket) = held.get_mut(consumed) {
                    merged.append(bucket);
                }
                consumed += 1;
            }
            merged.push(span);
        }
        for bucket in held.iter_mut().skip(consumed) {
            merged.append(bucket);
        }

        for group in &mut change_groups {
            if let Some(index) = merged.iter().position(|span| span.belongs_to(&group.id)) {
                group.start_line_index = index;
            }
        }

        DiffResult {
            change_groups,
            diff_spans: merged,
        }
    }
}

/// Find the pending group a span belongs to, if any.
#[must_use]
pub fn find_change_group_for_span<'a>(
    span: &TextSpan,
    change_groups: &'a [ChangeGroup],
) -> Option<&'a ChangeGroup> {
    let group_id = span.change_group_id.as_deref()?;
    change_groups.iter().find(|group| group.id == group_id)
}

/// Partition spans into runs sharing the same change group, for rendering.
///
/// Spans referencing a group that is no longer pending are treated as
/// ungrouped text.
#[must_use]
pub fn group_spans_by_change_group(
    spans: &[TextSpan],
    change_groups: &[ChangeGroup],
) -> Vec<SpanGroup> {
    let mut groups: Vec<SpanGroup> = Vec::new();

    for span in spans {
        let change_group = find_change_group_for_span(span, change_groups);
        let current_id = change_group.map(|group| group.id.as_str());

        match groups.last_mut() {
            Some(last) if last.change_group.as_ref().map(|g| g.id.as_str()) == current_id => {
                last.spans.push(span.clone());
            }
            _ => groups.push(SpanGroup {
                change_group: change_group.cloned(),
                spans: vec![span.clone()],
            }),
        }
    }

    groups
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HunkKind {
    Unchanged,
    Removed,
    Added,
}

#[derive(Debug)]
struct Hunk<'a> {
    kind: HunkKind,
    lines: &'a [&'a str],
}

fn hunks<'a>(original: &'a [&'a str], replacement: &'a [&'a str]) -> Vec<Hunk<'a>> {
    let mut hunks = Vec::new();

    for op in capture_diff_slices(Algorithm::Myers, original, replacement) {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => hunks.push(Hunk {
                kind: HunkKind::Unchanged,
                lines: &original[old_range],
            }),
            DiffTag::Delete => hunks.push(Hunk {
                kind: HunkKind::Removed,
                lines: &original[old_range],
            }),
            DiffTag::Insert => hunks.push(Hunk {
                kind: HunkKind::Added,
                lines: &replacement[new_range],
            }),
            DiffTag::Replace => {
                hunks.push(Hunk {
                    kind: HunkKind::Removed,
                    lines: &original[old_range],
                });
                hunks.push(Hunk {
                    kind: HunkKind::Added,
                    lines: &replacement[new_range],
                });
            }
        }
    }

    hunks
}

/// Split text into lines, dropping the empty artifact a trailing newline leaves.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text.split('\n').collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    lines
}
