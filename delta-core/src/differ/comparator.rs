//! Comparator logic: normalize, overlay, align and classify.

use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;
use tracing::debug;

use crate::differ::align::align_layouts;
use crate::differ::changes::LayoutDiffResult;
use crate::differ::classify::classify;
use crate::differ::overlay::{overlay_layouts, OverlayEntry};
use crate::error::{DeltaError, Result};
use crate::normalizer::normalize;
use crate::types::{Layout, Position, RawLayout};

/// Compare two normalized layouts.
///
/// Identical layouts short-circuit to an empty result (no change).
pub fn compare_layouts(old: &Layout, new: &Layout) -> Result<LayoutDiffResult> {
    let start = Instant::now();
    let mut result = LayoutDiffResult::new();

    if old == new {
        debug!(variables = old.len(), "layouts identical, nothing to compare");
        result.finalize(start.elapsed().as_secs_f64() * 1000.0);
        return Ok(result);
    }

    let overlay = overlay_layouts(old.items(), new.items());
    let dirty_bytes = dirty_byte_count(&overlay);
    let overlay_len = overlay.len();

    let aligned = align_layouts(overlay, old.items())?;
    for entry in classify(&aligned, old)? {
        result.add_entry(entry);
    }
    result.summary.dirty_bytes = dirty_bytes;

    debug!(
        old = old.len(),
        new = new.len(),
        overlay = overlay_len,
        aligned = aligned.len(),
        unsafe_findings = result.summary.unsafe_findings,
        dirty_bytes = %dirty_bytes,
        "layouts compared"
    );

    result.finalize(start.elapsed().as_secs_f64() * 1000.0);
    Ok(result)
}

/// Normalize two raw compiler layouts and compare them.
pub fn compare_raw(old: &RawLayout, new: &RawLayout) -> Result<LayoutDiffResult> {
    let old = normalize(old)?;
    let new = normalize(new)?;
    compare_layouts(&old, &new)
}

/// Parse two `storageLayout` JSON documents and compare them.
pub fn compare_json(old: &str, new: &str) -> Result<LayoutDiffResult> {
    let old = RawLayout::from_json(old)?;
    let new = RawLayout::from_json(new)?;
    compare_raw(&old, &new)
}

/// Count the dirty bytes in an overlay.
pub fn dirty_byte_count(overlay: &[OverlayEntry<'_>]) -> Position {
    overlay
        .iter()
        .filter(|entry| entry.is_dirty())
        .fold(Position::ZERO, |total, entry| {
            total.saturating_add(entry.range().width())
        })
}

/// A named pair of layouts to compare, e.g. one contract file before and after.
#[derive(Clone, Debug)]
pub struct LayoutPair {
    pub name: String,
    pub old: RawLayout,
    pub new: RawLayout,
}

impl LayoutPair {
    pub fn new(name: impl Into<String>, old: RawLayout, new: RawLayout) -> Self {
        Self {
            name: name.into(),
            old,
            new,
        }
    }
}

/// Result of comparing one [`LayoutPair`].
#[derive(Debug, Serialize)]
pub struct PairOutcome {
    pub name: String,
    #[serde(serialize_with = "serialize_outcome")]
    pub result: std::result::Result<LayoutDiffResult, DeltaError>,
}

fn serialize_outcome<S>(
    outcome: &std::result::Result<LayoutDiffResult, DeltaError>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    #[derive(Serialize)]
    #[serde(rename_all = "snake_case")]
    enum Tagged<'a> {
        Ok(&'a LayoutDiffResult),
        Error(String),
    }

    match outcome {
        Ok(result) => Tagged::Ok(result).serialize(serializer),
        Err(err) => Tagged::Error(err.to_string()).serialize(serializer),
    }
}

/// Compare many independent pairs in parallel using rayon.
///
/// Each pair is compared on its own; a malformed pair does not affect the
/// others. Outcomes are returned in input order.
pub fn compare_many(pairs: &[LayoutPair], num_threads: Option<usize>) -> Vec<PairOutcome> {
    let pool = match num_threads {
        Some(n) if n > 0 => rayon::ThreadPoolBuilder::new().num_threads(n).build().ok(),
        _ => None,
    };

    let compare_fn = |pair: &LayoutPair| -> PairOutcome {
        PairOutcome {
            name: pair.name.clone(),
            result: compare_raw(&pair.old, &pair.new),
        }
    };

    match pool {
        Some(pool) => pool.install(|| pairs.par_iter().map(compare_fn).collect()),
        None => pairs.par_iter().map(compare_fn).collect(),
    }
}
