//! Layout file discovery for batch comparisons.
//!
//! Walks an old and a new directory tree with the `ignore` crate and pairs
//! layout files by relative path.
//!
//! # Features
//!
//! - Native `.gitignore` support at all levels
//! - Custom `.deltaignore` file support
//! - Extension-based filtering
//! - Both trees walked concurrently via `rayon::join`

use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

use crate::differ::comparator::LayoutPair;
use crate::error::{DeltaError, Result};
use crate::types::RawLayout;

/// Name of the per-directory ignore file.
pub const IGNORE_FILENAME: &str = ".deltaignore";

/// A relative path and where it lives on each side.
///
/// At least one of `old` and `new` is set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutFilePair {
    /// Relative path from both scan roots, `/`-separated.
    pub path: String,
    pub old: Option<PathBuf>,
    pub new: Option<PathBuf>,
}

impl LayoutFilePair {
    /// Present on both sides.
    pub fn is_matched(&self) -> bool {
        self.old.is_some() && self.new.is_some()
    }

    /// Read and parse both sides into a [`LayoutPair`].
    ///
    /// A missing side becomes an empty layout, so a deleted file reports every
    /// variable as removed and an added file reports every variable as new.
    pub fn load(&self) -> Result<LayoutPair> {
        let old = load_side(self.old.as_deref())?;
        let new = load_side(self.new.as_deref())?;
        Ok(LayoutPair::new(self.path.clone(), old, new))
    }
}

fn load_side(path: Option<&Path>) -> Result<RawLayout> {
    match path {
        Some(path) => RawLayout::from_json(&fs::read_to_string(path)?),
        None => Ok(RawLayout::empty()),
    }
}

/// Result of pairing two directory trees.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PairScanResult {
    /// Pairs sorted by relative path.
    pub pairs: Vec<LayoutFilePair>,

    /// Files skipped by the extension filter.
    pub skipped_count: usize,

    /// Time taken for the scan in milliseconds.
    pub duration_ms: f64,
}

impl PairScanResult {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

struct TreeFiles {
    files: Vec<(String, PathBuf)>,
    skipped: usize,
}

fn relative_key(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn walk_tree(
    root: &Path,
    extensions: &Option<HashSet<String>>,
    ignore_patterns: &[String],
) -> TreeFiles {
    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false)
        .git_ignore(true)
        .require_git(false)
        .add_custom_ignore_filename(IGNORE_FILENAME);

    if !ignore_patterns.is_empty() {
        let mut override_builder = ignore::overrides::OverrideBuilder::new(root);
        for pattern in ignore_patterns {
            // `!` turns an override glob into an exclusion.
            if let Err(e) = override_builder.add(&format!("!{}", pattern)) {
                warn!(pattern = %pattern, error = %e, "invalid ignore pattern");
            }
        }
        match override_builder.build() {
            Ok(overrides) => {
                builder.overrides(overrides);
            }
            Err(e) => warn!(error = %e, "ignore patterns not applied"),
        }
    }

    let mut files = Vec::new();
    let mut skipped = 0;

    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }

        let path = entry.into_path();
        if let Some(filter) = extensions {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_lowercase);
            if !ext.map(|e| filter.contains(&e)).unwrap_or(false) {
                skipped += 1;
                continue;
            }
        }

        files.push((relative_key(root, &path), path));
    }

    TreeFiles { files, skipped }
}

/// Pair the layout files of two directory trees.
///
/// # Arguments
///
/// * `old_root` - Tree holding the pre-upgrade layouts
/// * `new_root` - Tree holding the post-upgrade layouts
/// * `extensions` - Optional list of file extensions to include (e.g. `["json"]`)
/// * `ignore_patterns` - Additional patterns to ignore (beyond `.gitignore` and `.deltaignore`)
pub fn find_layout_pairs(
    old_root: &Path,
    new_root: &Path,
    extensions: Option<&[String]>,
    ignore_patterns: &[String],
) -> Result<PairScanResult> {
    let start = Instant::now();

    for root in [old_root, new_root] {
        if !root.is_dir() {
            return Err(DeltaError::ScanRootMissing {
                path: root.display().to_string(),
            });
        }
    }

    let ext_filter: Option<HashSet<String>> = extensions.map(|exts| {
        exts.iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect()
    });

    let (old_files, new_files) = rayon::join(
        || walk_tree(old_root, &ext_filter, ignore_patterns),
        || walk_tree(new_root, &ext_filter, ignore_patterns),
    );

    let mut by_path: BTreeMap<String, LayoutFilePair> = BTreeMap::new();
    for (key, path) in old_files.files {
        by_path
            .entry(key.clone())
            .or_insert_with(|| LayoutFilePair {
                path: key,
                old: None,
                new: None,
            })
            .old = Some(path);
    }
    for (key, path) in new_files.files {
        by_path
            .entry(key.clone())
            .or_insert_with(|| LayoutFilePair {
                path: key,
                old: None,
                new: None,
            })
            .new = Some(path);
    }

    let pairs: Vec<LayoutFilePair> = by_path.into_values().collect();
    debug!(
        pairs = pairs.len(),
        matched = pairs.iter().filter(|p| p.is_matched()).count(),
        "paired layout files"
    );

    Ok(PairScanResult {
        pairs,
        skipped_count: old_files.skipped + new_files.skipped,
        duration_ms: start.elapsed().as_secs_f64() * 1000.0,
    })
}
