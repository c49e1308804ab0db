//! Storage Delta core - storage layout comparison engine.
//!
//! This crate compares the `storageLayout` output of the Solidity compiler
//! before and after a contract upgrade and reports every variable that moved,
//! disappeared or now collides with bytes that still hold old data.
//!
//! # Features
//!
//! - **Normalization**: slot/offset records become absolute byte ranges
//! - **Dirty byte detection**: old bytes the new layout no longer addresses
//! - **Classification**: unchanged, moved, new, removed, problematic
//! - **Batch comparison**: many contract pairs in parallel using Rayon
//! - **Text views**: two line-aligned reports ready for a line diff
//!
//! # Usage
//!
//! ```
//! use delta_core::{compare_json, render_views};
//!
//! let old = r#"{"storage":[{"label":"owner","offset":0,"slot":"0","type":"t_address"}],
//!              "types":{"t_address":{"encoding":"inplace","label":"address","numberOfBytes":"20"}}}"#;
//! let new = r#"{"storage":[{"label":"admin","offset":0,"slot":"0","type":"t_address"}],
//!              "types":{"t_address":{"encoding":"inplace","label":"address","numberOfBytes":"20"}}}"#;
//!
//! let result = compare_json(old, new).unwrap();
//! assert!(result.has_unsafe_findings());
//!
//! let views = render_views(&result.entries);
//! assert!(views.new.starts_with("🏴"));
//! ```

pub mod differ;
pub mod error;
pub mod normalizer;
pub mod render;
pub mod scanner;
pub mod types;

pub use differ::{
    compare_json, compare_layouts, compare_many, compare_raw, Classification, ClassifiedEntry,
    DeltaSummary, EntryView, LayoutDiffResult, LayoutPair, PairOutcome,
};
pub use error::{DeltaError, Result};
pub use normalizer::normalize;
pub use render::{format_line, render_views, ReportViews};
pub use scanner::{find_layout_pairs, LayoutFilePair, PairScanResult};
pub use types::{ByteRange, Layout, Position, RawLayout, StorageItem, TypeDescriptor, SLOT_SIZE};
