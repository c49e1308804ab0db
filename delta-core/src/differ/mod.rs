//! Storage layout diff engine.
//!
//! Compares the pre-upgrade and post-upgrade layouts of a contract and tags
//! every byte position with what happened to it.
//!
//! # Pipeline
//!
//! - **Overlay**: merge both layouts into one sequence where new variables win
//!   and every orphaned old byte shows up as a dirty run
//! - **Align**: pad the overlay and the old layout with placeholders until
//!   they line up start-for-start
//! - **Classify**: tag each aligned row (unchanged, moved, new, removed,
//!   problematic, moved and problematic, dirty byte run)
//! - **Batch**: compare many independent pairs concurrently via Rayon
//!
//! # Example
//!
//! ```
//! use delta_core::differ::compare_json;
//!
//! let old = r#"{"storage":[{"label":"a","offset":0,"slot":"0","type":"t_uint256"}],
//!              "types":{"t_uint256":{"encoding":"inplace","label":"uint256","numberOfBytes":"32"}}}"#;
//! let new = r#"{"storage":[],"types":null}"#;
//!
//! let result = compare_json(old, new).unwrap();
//! assert!(result.has_unsafe_findings());
//! assert_eq!(result.summary.removed, 1);
//! ```

pub mod align;
pub mod changes;
pub mod classify;
pub mod comparator;
pub mod overlay;

// Re-export types for lib.rs
pub use align::{align_layouts, Aligned, AlignedLayouts, UNDEFINED_LABEL};
pub use changes::{Classification, ClassifiedEntry, DeltaSummary, EntryView, LayoutDiffResult};
pub use classify::classify;
pub use comparator::{
    compare_json, compare_layouts, compare_many, compare_raw, dirty_byte_count, LayoutPair,
    PairOutcome,
};
pub use overlay::{overlay_layouts, OverlayEntry, DIRTY_LABEL};
