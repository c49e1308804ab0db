//! Fixed-width text views of a comparison.
//!
//! Produces two line-aligned reports, one for the old layout and one for the
//! new, so that a plain line diff of the two highlights every finding.

use serde::{Deserialize, Serialize};

use crate::differ::changes::{Classification, ClassifiedEntry, EntryView};
use crate::types::Position;

const LABEL_WIDTH: usize = 25;
const SLOT_WIDTH: usize = 8;
const OFFSET_WIDTH: usize = 5;

/// Marker used on lines that carry no finding.
const BLANK_MARKER: &str = "  ";

/// The two rendered reports.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportViews {
    pub old: String,
    pub new: String,
}

impl ReportViews {
    pub fn is_empty(&self) -> bool {
        self.old.is_empty() && self.new.is_empty()
    }
}

/// Format one report line.
///
/// Offset 0 is omitted and the slot padded instead, so whole-slot variables
/// line up in a column.
pub fn format_line(
    marker: &str,
    slot: Position,
    offset: u64,
    label: &str,
    type_label: &str,
) -> String {
    let position = if offset == 0 {
        format!("{:<width$}", slot.to_string(), width = SLOT_WIDTH)
    } else {
        format!("{}: {:<width$}", slot, offset, width = OFFSET_WIDTH)
    };
    format!(
        "{}  {}   {:<label_width$}    {}",
        marker,
        position,
        label,
        type_label,
        label_width = LABEL_WIDTH
    )
}

fn view_line(marker: &str, view: &EntryView) -> String {
    format_line(marker, view.slot, view.offset, &view.label, &view.type_label)
}

fn dirty_line(view: &EntryView) -> String {
    let bytes = view.width();
    let s = if bytes == Position::from(1u64) { "" } else { "s" };
    let label = format!("{} dirty byte{}", bytes, s);
    format_line(BLANK_MARKER, view.slot, view.offset, &label, "")
}

fn old_line(entry: &ClassifiedEntry) -> String {
    entry
        .old
        .as_ref()
        .map(|view| view_line(BLANK_MARKER, view))
        .unwrap_or_default()
}

fn new_line(entry: &ClassifiedEntry) -> String {
    let marker = entry.classification.marker();
    match (entry.classification, entry.new.as_ref()) {
        (Classification::DirtyByteRun, Some(view)) => dirty_line(view),
        (Classification::Removed, _) | (_, None) => marker.to_string(),
        (_, Some(view)) => view_line(marker, view),
    }
}

/// Render classified entries into the old and new views.
///
/// One line per entry on each side; neither view ends with a newline.
pub fn render_views(entries: &[ClassifiedEntry]) -> ReportViews {
    let old: Vec<String> = entries.iter().map(old_line).collect();
    let new: Vec<String> = entries.iter().map(new_line).collect();

    ReportViews {
        old: old.join("\n"),
        new: new.join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::differ::compare_json;
    use crate::types::ByteRange;

    fn pos(n: u64) -> Position {
        Position::from(n)
    }

    fn range(start: u64, end: u64) -> ByteRange {
        ByteRange::new(pos(start), pos(end))
    }

    fn view(label: &str, type_label: &str, slot: u64, offset: u64) -> EntryView {
        let start = slot * 32 + offset;
        EntryView {
            label: label.to_string(),
            type_label: type_label.to_string(),
            slot: pos(slot),
            offset,
            start: pos(start),
            end: pos(start + 1),
        }
    }

    #[test]
    fn test_format_line_whole_slot() {
        let line = format_line("🌱", pos(3), 0, "owner", "address");
        assert_eq!(
            line,
            format!("🌱  3          {:<25}    address", "owner")
        );
    }

    #[test]
    fn test_format_line_with_offset() {
        let line = format_line("  ", pos(1), 20, "paused", "bool");
        assert_eq!(line, format!("    1: 20      {:<25}    bool", "paused"));
    }

    #[test]
    fn test_removed_prints_bare_marker() {
        let entries = vec![ClassifiedEntry {
            classification: Classification::Removed,
            start: Position::ZERO,
            old: Some(view("a", "uint256", 0, 0)),
            new: None,
        }];
        let views = render_views(&entries);
        assert_eq!(views.new, "🪦");
        assert!(views.old.starts_with("    0 "));
        assert!(views.old.contains("uint256"));
    }

    #[test]
    fn test_dirty_run_line() {
        let entries = vec![ClassifiedEntry {
            classification: Classification::DirtyByteRun,
            start: pos(33),
            old: None,
            new: Some(EntryView::dirty(range(33, 64))),
        }];
        let views = render_views(&entries);
        assert_eq!(views.old, "");
        assert!(views.new.contains("1: 1"));
        assert!(views.new.contains("31 dirty bytes"));
        assert!(!views.new.contains("@dirty"));
    }

    #[test]
    fn test_single_dirty_byte_is_singular() {
        let line = dirty_line(&EntryView::dirty(range(0, 1)));
        assert!(line.contains("1 dirty byte "));
    }

    #[test]
    fn test_views_are_line_aligned_without_trailing_newline() {
        let old = r#"{"storage":[
            {"label":"a","offset":0,"slot":"0","type":"t_uint256"}],
            "types":{"t_uint256":{"encoding":"inplace","label":"uint256","numberOfBytes":"32"}}}"#;
        let new = r#"{"storage":[
            {"label":"a","offset":0,"slot":"1","type":"t_uint256"}],
            "types":{"t_uint256":{"encoding":"inplace","label":"uint256","numberOfBytes":"32"}}}"#;
        let result = compare_json(old, new).unwrap();
        let views = render_views(&result.entries);

        assert_eq!(views.old.lines().count(), 1);
        assert_eq!(views.old.split('\n').count(), views.new.split('\n').count());
        assert!(!views.new.ends_with('\n'));

        let new_lines: Vec<&str> = views.new.split('\n').collect();
        assert_eq!(new_lines[0], "🪦");
        assert!(new_lines[1].starts_with("🏳️  1 "));
    }

    #[test]
    fn test_format_line_full_width_slot() {
        let slot = Position::from(1u64) << 255;
        let line = format_line("🏴", slot, 0, "b", "uint256");
        assert!(line.starts_with(&format!("🏴  {}   ", slot)));
        assert!(line.ends_with("uint256"));
    }

    #[test]
    fn test_no_entries_renders_empty_views() {
        assert!(render_views(&[]).is_empty());
    }
}
