//! Classification tags and result structures for a layout comparison.

use serde::{Deserialize, Serialize};

use crate::differ::overlay::DIRTY_LABEL;
use crate::types::{decimal, ByteRange, Position, StorageItem};

/// Outcome assigned to one aligned position.
///
/// There is no separate "dirty" outcome: dirty bytes at an old start are
/// [`Classification::Removed`], dirty bytes anywhere else are
/// [`Classification::DirtyByteRun`], and [`DeltaSummary::dirty_bytes`] holds
/// the total.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Same variable at the same position.
    Unchanged,
    /// Variable exists in the old layout elsewhere and lands on free bytes.
    Moved,
    /// Variable never existed and lands on free bytes.
    New,
    /// Old variable whose start is no longer addressed.
    Removed,
    /// Variable collides with bytes the old layout used for something else.
    Problematic,
    /// Relocated variable that landed on bytes already in use.
    MovedAndProblematic,
    /// Stale bytes in territory that no old variable started at.
    DirtyByteRun,
}

impl Classification {
    pub const ALL: [Classification; 7] = [
        Classification::Unchanged,
        Classification::Moved,
        Classification::New,
        Classification::Removed,
        Classification::Problematic,
        Classification::MovedAndProblematic,
        Classification::DirtyByteRun,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Unchanged => "unchanged",
            Classification::Moved => "moved",
            Classification::New => "new",
            Classification::Removed => "removed",
            Classification::Problematic => "problematic",
            Classification::MovedAndProblematic => "moved_and_problematic",
            Classification::DirtyByteRun => "dirty_byte_run",
        }
    }

    /// Marker printed in front of the post-upgrade line.
    pub fn marker(&self) -> &'static str {
        match self {
            Classification::Problematic => "🏴",
            Classification::Moved => "🏳️",
            Classification::MovedAndProblematic => "🏁",
            Classification::Removed => "🪦",
            Classification::New => "🌱",
            Classification::Unchanged | Classification::DirtyByteRun => "  ",
        }
    }

    /// Whether the outcome is a hazard for an in-place upgrade.
    ///
    /// New variables and dirty runs in fresh territory are informational.
    pub fn is_unsafe(&self) -> bool {
        matches!(
            self,
            Classification::Problematic
                | Classification::Moved
                | Classification::MovedAndProblematic
                | Classification::Removed
        )
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side of a classified position, flattened for rendering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryView {
    pub label: String,
    pub type_label: String,
    #[serde(with = "decimal")]
    pub slot: Position,
    pub offset: u64,
    #[serde(with = "decimal")]
    pub start: Position,
    #[serde(with = "decimal")]
    pub end: Position,
}

impl EntryView {
    /// View of a dirty run. Slot and offset are derived from the start byte.
    pub fn dirty(range: ByteRange) -> Self {
        Self {
            label: DIRTY_LABEL.to_string(),
            type_label: String::new(),
            slot: range.slot(),
            offset: range.offset(),
            start: range.start,
            end: range.end,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.label == DIRTY_LABEL
    }

    pub fn width(&self) -> Position {
        self.end.saturating_sub(self.start)
    }
}

impl From<&StorageItem> for EntryView {
    fn from(item: &StorageItem) -> Self {
        Self {
            label: item.label.clone(),
            type_label: item.ty.label.clone(),
            slot: item.slot,
            offset: item.offset,
            start: item.start,
            end: item.end,
        }
    }
}

/// A classified aligned position.
///
/// `old` is the pre-upgrade variable starting here, `new` the post-upgrade
/// entry. A [`Classification::Removed`] row has no `new`, a
/// [`Classification::New`] row has no `old`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedEntry {
    pub classification: Classification,
    #[serde(with = "decimal")]
    pub start: Position,
    pub old: Option<EntryView>,
    pub new: Option<EntryView>,
}

impl ClassifiedEntry {
    /// The view the row is primarily about: the new side when there is one.
    pub fn primary(&self) -> Option<&EntryView> {
        self.new.as_ref().or(self.old.as_ref())
    }

    pub fn label(&self) -> &str {
        self.primary().map(|v| v.label.as_str()).unwrap_or_default()
    }

    pub fn type_label(&self) -> &str {
        self.primary().map(|v| v.type_label.as_str()).unwrap_or_default()
    }

    pub fn slot(&self) -> Position {
        self.primary().map(|v| v.slot).unwrap_or_default()
    }

    pub fn offset(&self) -> u64 {
        self.primary().map(|v| v.offset).unwrap_or_default()
    }

    /// Size of the dirty run for [`Classification::DirtyByteRun`] rows.
    pub fn dirty_bytes(&self) -> Option<Position> {
        match (&self.classification, &self.new) {
            (Classification::DirtyByteRun, Some(view)) => Some(view.width()),
            _ => None,
        }
    }
}

/// Counts per classification for a comparison.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaSummary {
    pub unchanged: u32,
    pub moved: u32,
    pub new: u32,
    pub removed: u32,
    pub problematic: u32,
    pub moved_and_problematic: u32,
    pub dirty_byte_runs: u32,

    /// Total bytes left dirty by the upgrade, wherever they sit.
    #[serde(with = "decimal")]
    pub dirty_bytes: Position,

    /// Entries whose classification is unsafe for an in-place upgrade.
    pub unsafe_findings: u32,
}

impl DeltaSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the counter for a classification.
    pub fn record(&mut self, classification: Classification) {
        match classification {
            Classification::Unchanged => self.unchanged += 1,
            Classification::Moved => self.moved += 1,
            Classification::New => self.new += 1,
            Classification::Removed => self.removed += 1,
            Classification::Problematic => self.problematic += 1,
            Classification::MovedAndProblematic => self.moved_and_problematic += 1,
            Classification::DirtyByteRun => self.dirty_byte_runs += 1,
        }

        if classification.is_unsafe() {
            self.unsafe_findings += 1;
        }
    }

    pub fn count(&self, classification: Classification) -> u32 {
        match classification {
            Classification::Unchanged => self.unchanged,
            Classification::Moved => self.moved,
            Classification::New => self.new,
            Classification::Removed => self.removed,
            Classification::Problematic => self.problematic,
            Classification::MovedAndProblematic => self.moved_and_problematic,
            Classification::DirtyByteRun => self.dirty_byte_runs,
        }
    }

    /// Generate human-readable summary string.
    pub fn text(&self) -> String {
        let parts: Vec<String> = Classification::ALL
            .iter()
            .filter(|c| **c != Classification::Unchanged)
            .filter_map(|c| {
                let n = self.count(*c);
                (n > 0).then(|| format!("{} {}", n, c.as_str().replace('_', " ")))
            })
            .collect();

        if parts.is_empty() {
            return "No changes".to_string();
        }

        let mut text = parts.join(", ");
        if !self.dirty_bytes.is_zero() {
            let s = if self.dirty_bytes == Position::from(1u64) { "" } else { "s" };
            text.push_str(&format!("; {} dirty byte{}", self.dirty_bytes, s));
        }
        text
    }
}

/// Complete result of comparing two layouts.
///
/// An empty `entries` list means the layouts are identical.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LayoutDiffResult {
    /// Classified positions in ascending byte order
    pub entries: Vec<ClassifiedEntry>,

    /// Summary statistics
    pub summary: DeltaSummary,

    /// Human-readable summary text
    pub summary_text: String,

    /// Duration of the comparison in milliseconds
    pub duration_ms: f64,
}

impl LayoutDiffResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry and update summary.
    pub fn add_entry(&mut self, entry: ClassifiedEntry) {
        self.summary.record(entry.classification);
        self.entries.push(entry);
    }

    /// Finalize the result with timing and summary text.
    pub fn finalize(&mut self, duration_ms: f64) {
        self.duration_ms = duration_ms;
        self.summary_text = self.summary.text();
    }

    /// False when the two layouts were identical.
    pub fn is_changed(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Check if there are findings that make the upgrade unsafe.
    pub fn has_unsafe_findings(&self) -> bool {
        self.summary.unsafe_findings > 0
    }

    /// Entries with the given classification.
    pub fn filter(&self, classification: Classification) -> Vec<&ClassifiedEntry> {
        self.entries
            .iter()
            .filter(|e| e.classification == classification)
            .collect()
    }
}
