//! Classification of aligned positions.

use crate::differ::align::{Aligned, AlignedLayouts};
use crate::differ::changes::{Classification, ClassifiedEntry, EntryView};
use crate::differ::overlay::OverlayEntry;
use crate::error::{DeltaError, Result};
use crate::types::{Layout, StorageItem};

/// Classify a new item sitting at a start that did exist in the old layout.
fn classify_replacement(new: &StorageItem, old: &StorageItem, old_layout: &Layout) -> Classification {
    if new.is_structurally_identical(old) {
        Classification::Unchanged
    } else if old_layout.contains_identical(new) {
        Classification::MovedAndProblematic
    } else {
        Classification::Problematic
    }
}

/// Classify a new item sitting at a start no old variable used.
fn classify_fresh(new: &StorageItem, old_layout: &Layout) -> Classification {
    let existed = old_layout.contains_identical(new);
    match (old_layout.overlaps(&new.range()), existed) {
        (true, true) => Classification::MovedAndProblematic,
        (true, false) => Classification::Problematic,
        (false, true) => Classification::Moved,
        (false, false) => Classification::New,
    }
}

fn classify_row(
    overlay: &Aligned<OverlayEntry<'_>>,
    old: &Aligned<&StorageItem>,
    old_layout: &Layout,
) -> Result<ClassifiedEntry> {
    let start = overlay.start();

    let (classification, old_view, new_view) = match (overlay, old) {
        (Aligned::Entry(OverlayEntry::Dirty(_)), Aligned::Entry(old)) => {
            (Classification::Removed, Some(EntryView::from(*old)), None)
        }
        (Aligned::Entry(OverlayEntry::Item(new)), Aligned::Entry(old)) => (
            classify_replacement(new, old, old_layout),
            Some(EntryView::from(*old)),
            Some(EntryView::from(*new)),
        ),
        (Aligned::Entry(OverlayEntry::Dirty(range)), Aligned::Undefined { .. }) => (
            Classification::DirtyByteRun,
            None,
            Some(EntryView::dirty(*range)),
        ),
        (Aligned::Entry(OverlayEntry::Item(new)), Aligned::Undefined { .. }) => (
            classify_fresh(new, old_layout),
            None,
            Some(EntryView::from(*new)),
        ),
        (Aligned::Undefined { .. }, Aligned::Entry(old)) => {
            (Classification::Removed, Some(EntryView::from(*old)), None)
        }
        (Aligned::Undefined { .. }, Aligned::Undefined { .. }) => {
            return Err(DeltaError::UnalignedPosition { start });
        }
    };

    Ok(ClassifiedEntry {
        classification,
        start,
        old: old_view,
        new: new_view,
    })
}

/// Classify every aligned position, in order.
///
/// `old_layout` is the full, unaligned old layout. It answers the
/// "structurally identical item exists elsewhere" and overlap queries.
pub fn classify(aligned: &AlignedLayouts<'_>, old_layout: &Layout) -> Result<Vec<ClassifiedEntry>> {
    if aligned.overlay.len() != aligned.old.len() {
        return Err(DeltaError::AlignmentMismatch {
            overlay: aligned.overlay.len(),
            old: aligned.old.len(),
        });
    }

    aligned
        .rows()
        .map(|(overlay, old)| classify_row(overlay, old, old_layout))
        .collect()
}
