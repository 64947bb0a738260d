//! Structured comparison of two prompt version snapshots.
//!
//! Produces field-level metadata deltas plus a line-oriented diff of the
//! prompt text. The line diff is an LCS alignment whose tie-breaks depend
//! only on line content, so `diff(a, b)` and `diff(b, a)` select the same
//! alignment with insert/remove roles swapped.

use serde::Serialize;
use serde_json::Value;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// The user-facing content of a version, borrowed from whatever row type
/// the caller holds.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub tags: &'a [String],
    pub final_prompt: &'a str,
}

// ---------------------------------------------------------------------------
// Field-level changes
// ---------------------------------------------------------------------------

/// How a metadata field differs between the two sides.
///
/// - `Added`   -- absent on the `from` side, present on the `to` side.
/// - `Removed` -- present on the `from` side, absent on the `to` side.
/// - `Changed` -- present on both sides with different values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    Added,
    Removed,
    Changed,
}

impl DiffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Changed => "changed",
        }
    }
}

/// One changed metadata field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: &'static str,
    pub status: DiffStatus,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

/// Compare the metadata fields of two snapshots. Unchanged fields are
/// omitted, so identical snapshots yield an empty list.
pub fn compare_fields(from: &Snapshot<'_>, to: &Snapshot<'_>) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    if from.title != to.title {
        changes.push(FieldChange {
            field: "title",
            status: DiffStatus::Changed,
            old: Some(Value::from(from.title)),
            new: Some(Value::from(to.title)),
        });
    }

    let description = |d: Option<&str>| d.filter(|s| !s.is_empty()).map(Value::from);
    if let Some(change) = optional_change("description", description(from.description), description(to.description)) {
        changes.push(change);
    }

    let tags = |t: &[String]| (!t.is_empty()).then(|| Value::from(t.to_vec()));
    if tag_set(from.tags) != tag_set(to.tags) {
        if let Some(change) = optional_change("tags", tags(from.tags), tags(to.tags)) {
            changes.push(change);
        }
    }

    changes
}

fn optional_change(field: &'static str, old: Option<Value>, new: Option<Value>) -> Option<FieldChange> {
    let status = match (&old, &new) {
        (None, None) => return None,
        (None, Some(_)) => DiffStatus::Added,
        (Some(_), None) => DiffStatus::Removed,
        (Some(a), Some(b)) if a == b => return None,
        (Some(_), Some(_)) => DiffStatus::Changed,
    };
    Some(FieldChange {
        field,
        status,
        old,
        new,
    })
}

/// Tags compare as a set: order and duplicates are not meaningful.
fn tag_set(tags: &[String]) -> Vec<&str> {
    let mut set: Vec<&str> = tags.iter().map(String::as_str).collect();
    set.sort_unstable();
    set.dedup();
    set
}

// ---------------------------------------------------------------------------
// Line-level diff
// ---------------------------------------------------------------------------

/// Role of a span within the line diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    Inserted,
    Removed,
    Unchanged,
}

impl SpanKind {
    fn inverted(self) -> Self {
        match self {
            Self::Inserted => Self::Removed,
            Self::Removed => Self::Inserted,
            Self::Unchanged => Self::Unchanged,
        }
    }
}

/// A run of consecutive lines sharing one role.
///
/// `old_start` / `new_start` are 0-based line offsets into the old and new
/// text. For an inserted span `old_start` is the position in the old text
/// where the lines were inserted; removed spans mirror this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineSpan {
    pub kind: SpanKind,
    pub old_start: usize,
    pub new_start: usize,
    pub lines: Vec<String>,
}

/// Line diff of the prompt text, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContentDiff {
    pub spans: Vec<LineSpan>,
    pub inserted_lines: usize,
    pub removed_lines: usize,
    pub unchanged_lines: usize,
}

impl ContentDiff {
    /// True when the two texts have identical lines.
    pub fn is_identical(&self) -> bool {
        self.inserted_lines == 0 && self.removed_lines == 0
    }

    /// The diff as seen from the other direction: inserted and removed swap,
    /// as do old and new offsets.
    pub fn mirrored(&self) -> Self {
        Self {
            spans: self
                .spans
                .iter()
                .map(|span| LineSpan {
                    kind: span.kind.inverted(),
                    old_start: span.new_start,
                    new_start: span.old_start,
                    lines: span.lines.clone(),
                })
                .collect(),
            inserted_lines: self.removed_lines,
            removed_lines: self.inserted_lines,
            unchanged_lines: self.unchanged_lines,
        }
    }
}

/// Upper bound on LCS table cells (`u32` each) for the differing middle of
/// two texts, after the shared leading and trailing lines are set aside.
pub const MAX_DIFF_CELLS: usize = 4_000_000;

/// Compute a line diff between two texts using LCS.
///
/// Lines shared at the start and end are matched directly; only the middle
/// goes through the quadratic table. Fails with [`CoreError::Validation`]
/// when that middle would need more than [`MAX_DIFF_CELLS`] cells.
pub fn compute_line_diff(old: &str, new: &str) -> Result<ContentDiff, CoreError> {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();

    let prefix = old_lines
        .iter()
        .zip(&new_lines)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old_lines[prefix..]
        .iter()
        .rev()
        .zip(new_lines[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old_lines[prefix..old_lines.len() - suffix];
    let new_mid = &new_lines[prefix..new_lines.len() - suffix];
    let m = old_mid.len();
    let n = new_mid.len();

    let cells = (m + 1).saturating_mul(n + 1);
    if cells > MAX_DIFF_CELLS {
        return Err(CoreError::Validation(format!(
            "Versions differ in too many lines to compare ({m} old against {n} new)"
        )));
    }

    // Row-major LCS table over the middle section.
    let width = n + 1;
    let mut lcs = vec![0u32; cells];
    for i in 1..=m {
        for j in 1..=n {
            lcs[i * width + j] = if old_mid[i - 1] == new_mid[j - 1] {
                lcs[(i - 1) * width + j - 1] + 1
            } else {
                lcs[(i - 1) * width + j].max(lcs[i * width + j - 1])
            };
        }
    }

    // Steps are collected back to front: shared tail, middle, shared head.
    // Each records (kind, old_pos, new_pos, line).
    let mut steps: Vec<(SpanKind, usize, usize, &str)> =
        Vec::with_capacity(prefix + suffix + m + n);
    for k in (0..suffix).rev() {
        let old_pos = prefix + m + k;
        steps.push((SpanKind::Unchanged, old_pos, prefix + n + k, old_lines[old_pos]));
    }

    let mut i = m;
    let mut j = n;
    while i > 0 || j > 0 {
        if i > 0 && j > 0 && old_mid[i - 1] == new_mid[j - 1] {
            steps.push((SpanKind::Unchanged, prefix + i - 1, prefix + j - 1, old_mid[i - 1]));
            i -= 1;
            j -= 1;
            continue;
        }

        let take_removed = if i == 0 {
            false
        } else if j == 0 {
            true
        } else {
            match lcs[(i - 1) * width + j].cmp(&lcs[i * width + j - 1]) {
                std::cmp::Ordering::Greater => true,
                std::cmp::Ordering::Less => false,
                // Tie: break on content so swapping sides picks the same line.
                std::cmp::Ordering::Equal => old_mid[i - 1] > new_mid[j - 1],
            }
        };

        if take_removed {
            steps.push((SpanKind::Removed, prefix + i - 1, prefix + j, old_mid[i - 1]));
            i -= 1;
        } else {
            steps.push((SpanKind::Inserted, prefix + i, prefix + j - 1, new_mid[j - 1]));
            j -= 1;
        }
    }

    for k in (0..prefix).rev() {
        steps.push((SpanKind::Unchanged, k, k, old_lines[k]));
    }
    steps.reverse();

    let mut diff = ContentDiff::default();
    for (kind, old_pos, new_pos, line) in steps {
        match kind {
            SpanKind::Inserted => diff.inserted_lines += 1,
            SpanKind::Removed => diff.removed_lines += 1,
            SpanKind::Unchanged => diff.unchanged_lines += 1,
        }
        match diff.spans.last_mut() {
            Some(span) if span.kind == kind => span.lines.push(line.to_string()),
            _ => diff.spans.push(LineSpan {
                kind,
                old_start: old_pos,
                new_start: new_pos,
                lines: vec![line.to_string()],
            }),
        }
    }
    Ok(diff)
}

// ---------------------------------------------------------------------------
// Combined comparison
// ---------------------------------------------------------------------------

/// Metadata deltas plus the prompt text diff.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotDiff {
    pub changes: Vec<FieldChange>,
    pub diff: ContentDiff,
}

/// Compare two snapshots.
pub fn compare_snapshots(from: &Snapshot<'_>, to: &Snapshot<'_>) -> Result<SnapshotDiff, CoreError> {
    Ok(SnapshotDiff {
        changes: compare_fields(from, to),
        diff: compute_line_diff(from.final_prompt, to.final_prompt)?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
