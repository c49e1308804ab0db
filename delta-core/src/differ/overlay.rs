//! Overlay merge of an old and a new layout.
//!
//! The overlay is the new layout with every old byte it no longer addresses
//! made visible as a dirty run.

use tracing::trace;

use crate::types::{ByteRange, Position, StorageItem};

/// Label used for dirty runs in rendered and serialized output.
pub const DIRTY_LABEL: &str = "@dirty";

/// One entry of the merged overlay sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayEntry<'a> {
    /// A variable of the new layout, verbatim.
    Item(&'a StorageItem),
    /// Bytes occupied in the old layout that nothing in the new layout addresses.
    Dirty(ByteRange),
}

impl OverlayEntry<'_> {
    pub fn range(&self) -> ByteRange {
        match self {
            OverlayEntry::Item(item) => item.range(),
            OverlayEntry::Dirty(range) => *range,
        }
    }

    pub fn start(&self) -> Position {
        self.range().start
    }

    pub fn is_dirty(&self) -> bool {
        matches!(self, OverlayEntry::Dirty(_))
    }

    pub fn label(&self) -> &str {
        match self {
            OverlayEntry::Item(item) => &item.label,
            OverlayEntry::Dirty(_) => DIRTY_LABEL,
        }
    }
}

/// Merge `old` and `new` into one ascending, non-overlapping sequence.
///
/// Both inputs must be ascending and non-overlapping. New items always win;
/// old bytes outside every new item come out as [`OverlayEntry::Dirty`],
/// split wherever new coverage begins or ends. Bytes covered by neither side
/// are left out.
pub fn overlay_layouts<'a>(old: &[StorageItem], new: &'a [StorageItem]) -> Vec<OverlayEntry<'a>> {
    // Remaining uncovered part of each old item. Only `start` ever moves.
    let mut remaining: Vec<ByteRange> = old.iter().map(StorageItem::range).collect();
    let mut result = Vec::with_capacity(old.len() + new.len());

    let mut old_index = 0;
    let mut new_index = 0;

    while old_index < remaining.len() || new_index < new.len() {
        let new_item = new.get(new_index);
        let old_range = remaining.get(old_index).copied();

        match (new_item, old_range) {
            (Some(new_item), None) => {
                result.push(OverlayEntry::Item(new_item));
                new_index += 1;
            }
            (Some(new_item), Some(old_range)) if new_item.start < old_range.start => {
                result.push(OverlayEntry::Item(new_item));
                new_index += 1;
                // Skip old items the new one fully supersedes.
                while old_index < remaining.len() && remaining[old_index].end <= new_item.end {
                    trace!(
                        start = %remaining[old_index].start,
                        end = %remaining[old_index].end,
                        "old range superseded"
                    );
                    old_index += 1;
                }
                // The next old item may still start underneath the new one.
                if let Some(next) = remaining.get_mut(old_index) {
                    if next.start < new_item.end {
                        next.start = new_item.end;
                    }
                }
            }
            (None, Some(old_range)) => {
                result.push(OverlayEntry::Dirty(old_range));
                old_index += 1;
            }
            (Some(new_item), Some(old_range)) if old_range.end <= new_item.start => {
                result.push(OverlayEntry::Dirty(old_range));
                old_index += 1;
            }
            (Some(new_item), Some(old_range)) => {
                if old_range.start < new_item.start {
                    result.push(OverlayEntry::Dirty(ByteRange::new(
                        old_range.start,
                        new_item.start,
                    )));
                }
                if new_item.end < old_range.end {
                    remaining[old_index].start = new_item.end;
                } else {
                    old_index += 1;
                }
            }
            (None, None) => break,
        }
    }

    result.retain(|entry| !entry.range().is_empty());
    result
}
