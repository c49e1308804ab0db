//! Position alignment of the overlay against the old layout.
//!
//! After alignment both sequences have the same length and index `i` refers
//! to the same start byte on both sides. Missing starts are filled with
//! [`Aligned::Undefined`] placeholders.

use std::collections::HashSet;

use tracing::trace;

use crate::differ::overlay::OverlayEntry;
use crate::error::{DeltaError, Result};
use crate::types::{Position, StorageItem};

/// Label used for alignment placeholders in rendered output.
pub const UNDEFINED_LABEL: &str = "@undefined";

/// Anything with a start byte.
pub trait Positioned {
    fn start(&self) -> Position;
}

impl Positioned for StorageItem {
    fn start(&self) -> Position {
        self.start
    }
}

impl Positioned for OverlayEntry<'_> {
    fn start(&self) -> Position {
        self.range().start
    }
}

impl<T: Positioned + ?Sized> Positioned for &T {
    fn start(&self) -> Position {
        (**self).start()
    }
}

/// A slot of an aligned sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Aligned<T> {
    Entry(T),
    /// Placeholder with no content; only keeps the two sides in step.
    Undefined { start: Position },
}

impl<T: Positioned> Aligned<T> {
    pub fn start(&self) -> Position {
        match self {
            Aligned::Entry(entry) => entry.start(),
            Aligned::Undefined { start } => *start,
        }
    }

    pub fn entry(&self) -> Option<&T> {
        match self {
            Aligned::Entry(entry) => Some(entry),
            Aligned::Undefined { .. } => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Aligned::Entry(_))
    }
}

/// The two aligned sequences, index-matched.
#[derive(Debug)]
pub struct AlignedLayouts<'a> {
    pub overlay: Vec<Aligned<OverlayEntry<'a>>>,
    pub old: Vec<Aligned<&'a StorageItem>>,
}

impl<'a> AlignedLayouts<'a> {
    pub fn len(&self) -> usize {
        self.overlay.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlay.is_empty()
    }

    /// Iterate over `(overlay, old)` rows.
    pub fn rows(
        &self,
    ) -> impl Iterator<Item = (&Aligned<OverlayEntry<'a>>, &Aligned<&'a StorageItem>)> {
        self.overlay.iter().zip(self.old.iter())
    }
}

/// Add a placeholder to `base` for every start in `reference` that `base` lacks,
/// then stably re-sort by start.
fn insert_missing_starts<T: Positioned>(
    base: Vec<Aligned<T>>,
    reference: impl IntoIterator<Item = Position>,
) -> Vec<Aligned<T>> {
    let present: HashSet<Position> = base.iter().map(Aligned::start).collect();
    let mut added = HashSet::new();
    let mut result = base;

    for start in reference {
        if !present.contains(&start) && added.insert(start) {
            trace!(start = %start, "inserting alignment placeholder");
            result.push(Aligned::Undefined { start });
        }
    }

    result.sort_by_key(Aligned::start);
    result
}

/// Align the overlay against the old layout.
///
/// The overlay is padded with the old starts first, then the old layout is
/// padded with the starts of the padded overlay. Fails with
/// [`DeltaError::AlignmentMismatch`] if the lengths still differ.
pub fn align_layouts<'a>(
    overlay: Vec<OverlayEntry<'a>>,
    old: &'a [StorageItem],
) -> Result<AlignedLayouts<'a>> {
    let overlay = insert_missing_starts(
        overlay.into_iter().map(Aligned::Entry).collect(),
        old.iter().map(|item| item.start),
    );
    let old = insert_missing_starts(
        old.iter().map(Aligned::Entry).collect(),
        overlay.iter().map(Aligned::start),
    );

    if overlay.len() != old.len() {
        return Err(DeltaError::AlignmentMismatch {
            overlay: overlay.len(),
            old: old.len(),
        });
    }

    Ok(AlignedLayouts { overlay, old })
}
