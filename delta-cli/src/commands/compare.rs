//! Compare command - storage layout delta between two compiler outputs
//!
//! Loads two `storageLayout` JSON documents, classifies every position and
//! renders the old and new layout side by side.

use std::fs;
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use delta_core::{
    compare_raw, render_views, Classification, LayoutDiffResult, RawLayout, ReportViews,
};
use serde::Serialize;
use tracing::debug;

use crate::diff_tool;
use crate::output::{Column, CsvOutput, Output, OutputConfig, OutputFormat, Outputter, TableOutput};

/// Printed in table mode when both layouts are identical.
pub const NO_CHANGES_MESSAGE: &str = "No storage layout changes.";

const LEGEND: &str =
    "🏴 problematic  🏳️ moved  🏁 moved & problematic  🪦 removed  🌱 new";

/// Flags shared by `compare` and `batch`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    /// Print nothing unless there is an unsafe finding
    pub omit_new: bool,
    /// Fail when unsafe findings exist
    pub strict: bool,
    /// Context lines for the unified diff
    pub context: usize,
}

/// Read and parse one `storageLayout` JSON file.
pub fn load_layout(path: &Path) -> anyhow::Result<RawLayout> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    RawLayout::from_json(&text)
        .with_context(|| format!("Invalid storage layout JSON in {}", path.display()))
}

/// Comparison of one pair of layout files.
#[derive(Debug, Serialize)]
pub struct CompareReport {
    pub old_path: String,
    pub new_path: String,
    pub result: LayoutDiffResult,
    #[serde(skip)]
    views: ReportViews,
}

impl CompareReport {
    pub fn new(old_path: String, new_path: String, result: LayoutDiffResult) -> Self {
        let views = render_views(&result.entries);
        Self {
            old_path,
            new_path,
            result,
            views,
        }
    }

    /// One row per classified position.
    fn rows(&self) -> Vec<EntryRow> {
        self.result
            .entries
            .iter()
            .map(|entry| {
                let old = entry.old.as_ref();
                EntryRow {
                    classification: entry.classification.to_string(),
                    slot: entry.slot().to_string(),
                    offset: entry.offset(),
                    label: entry.label().to_string(),
                    type_label: entry.type_label().to_string(),
                    old_label: old.map(|v| v.label.clone()).unwrap_or_default(),
                    old_type: old.map(|v| v.type_label.clone()).unwrap_or_default(),
                    dirty_bytes: entry.dirty_bytes().map(|n| n.to_string()),
                }
            })
            .collect()
    }

    /// Non-zero counts per classification, plus the dirty byte total.
    fn counts_table(&self, config: &OutputConfig) -> String {
        let summary = &self.result.summary;
        let mut pairs: Vec<(&str, String)> = Classification::ALL
            .iter()
            .filter(|c| summary.count(**c) > 0)
            .map(|c| (c.as_str(), summary.count(*c).to_string()))
            .collect();
        if !summary.dirty_bytes.is_zero() {
            pairs.push(("dirty_bytes", summary.dirty_bytes.to_string()));
        }
        TableOutput::format_key_value(&pairs, config)
    }

    fn summary_line(&self) -> String {
        let summary = &self.result.summary_text;
        if self.result.has_unsafe_findings() {
            format!("{} {}", "UNSAFE:".red().bold(), summary)
        } else {
            format!("{} {}", "SAFE:".green().bold(), summary)
        }
    }
}

#[derive(Debug, Serialize)]
struct EntryRow {
    classification: String,
    slot: String,
    offset: u64,
    label: String,
    type_label: String,
    old_label: String,
    old_type: String,
    dirty_bytes: Option<String>,
}

fn entry_columns() -> Vec<Column> {
    vec![
        Column::new("classification", "classification"),
        Column::new("slot", "slot"),
        Column::new("offset", "offset"),
        Column::new("label", "label"),
        Column::new("type", "type_label"),
        Column::new("old_label", "old_label"),
        Column::new("old_type", "old_type"),
        Column::new("dirty_bytes", "dirty_bytes"),
    ]
}

impl Outputter for CompareReport {
    fn to_table(&self, config: &OutputConfig) -> String {
        if !self.result.is_changed() {
            return NO_CHANGES_MESSAGE.to_string();
        }

        let old_lines = self.views.old.split('\n');
        let new_lines = self.views.new.split('\n');
        let rows: Vec<Vec<String>> = old_lines
            .zip(new_lines)
            .map(|(old, new)| vec![old.to_string(), new.to_string()])
            .collect();

        let old_header = format!("{} (old)", self.old_path);
        let new_header = format!("{} (new)", self.new_path);
        let table = TableOutput::from_rows(&[old_header.as_str(), new_header.as_str()], &rows, config);

        format!(
            "{}\n{}\n{}\n{}",
            table,
            self.counts_table(config),
            self.summary_line(),
            LEGEND.dimmed()
        )
    }

    fn to_csv(&self, config: &OutputConfig) -> String {
        CsvOutput::format_with_columns(&self.rows(), &entry_columns(), config)
    }
}

/// Run the compare command
pub fn run(
    old_path: &Path,
    new_path: &Path,
    options: ReportOptions,
    config: OutputConfig,
) -> anyhow::Result<()> {
    let old = load_layout(old_path)?;
    let new = load_layout(new_path)?;

    let result = compare_raw(&old, &new).with_context(|| {
        format!(
            "Failed to compare {} with {}",
            old_path.display(),
            new_path.display()
        )
    })?;
    debug!(
        entries = result.entries.len(),
        unsafe_findings = result.summary.unsafe_findings,
        duration_ms = result.duration_ms,
        "comparison finished"
    );

    let has_unsafe = result.has_unsafe_findings();
    let unsafe_findings = result.summary.unsafe_findings;

    if options.omit_new && !has_unsafe {
        debug!("no unsafe findings, report omitted");
        return Ok(());
    }

    let report = CompareReport::new(
        old_path.display().to_string(),
        new_path.display().to_string(),
        result,
    );

    if config.format == OutputFormat::Diff {
        let diff = diff_tool::unified_diff(
            &report.old_path,
            &report.new_path,
            &report.views.old,
            &report.views.new,
            options.context,
        )?;
        if !diff.is_empty() {
            println!("{}", diff);
        }
    } else {
        Output::with_config(report, config).render()?;
    }

    if options.strict && has_unsafe {
        anyhow::bail!(
            "{} unsafe storage layout finding(s); the upgrade may corrupt state",
            unsafe_findings
        );
    }

    Ok(())
}
