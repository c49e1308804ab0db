//! Batch command - compare every layout file of two directory trees
//!
//! Files are paired by relative path and compared in parallel. A file that
//! cannot be read or parsed is reported on its own row without stopping the
//! rest of the batch.

use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use delta_core::{compare_many, find_layout_pairs, LayoutPair, PairOutcome};
use serde::Serialize;
use tracing::{debug, warn};

use super::compare::ReportOptions;
use crate::output::{Alignment, Column, CsvOutput, Output, OutputConfig, Outputter, TableOutput};

/// Scanner and worker settings for a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchSettings {
    pub extensions: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub threads: Option<usize>,
}

/// Outcome of every file pair in a batch.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub old_dir: String,
    pub new_dir: String,
    pub files: Vec<PairOutcome>,
}

#[derive(Debug, Serialize)]
struct BatchRow {
    file: String,
    status: &'static str,
    unsafe_findings: Option<u32>,
    dirty_bytes: Option<String>,
    summary: String,
}

impl BatchReport {
    pub fn error_count(&self) -> usize {
        self.files.iter().filter(|f| f.result.is_err()).count()
    }

    pub fn unsafe_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(&f.result, Ok(r) if r.has_unsafe_findings()))
            .count()
    }

    fn rows(&self) -> Vec<BatchRow> {
        self.files
            .iter()
            .map(|outcome| match &outcome.result {
                Ok(result) => BatchRow {
                    file: outcome.name.clone(),
                    status: if result.has_unsafe_findings() {
                        "unsafe"
                    } else if result.is_changed() {
                        "changed"
                    } else {
                        "unchanged"
                    },
                    unsafe_findings: Some(result.summary.unsafe_findings),
                    dirty_bytes: Some(result.summary.dirty_bytes.to_string()),
                    summary: result.summary_text.clone(),
                },
                Err(err) => BatchRow {
                    file: outcome.name.clone(),
                    status: "error",
                    unsafe_findings: None,
                    dirty_bytes: None,
                    summary: err.to_string(),
                },
            })
            .collect()
    }

    fn columns() -> Vec<Column> {
        vec![
            Column::new("File", "file").with_max_width(48),
            Column::new("Status", "status"),
            Column::new("Unsafe", "unsafe_findings").with_alignment(Alignment::Right),
            Column::new("Dirty bytes", "dirty_bytes").with_alignment(Alignment::Right),
            Column::new("Summary", "summary"),
        ]
    }

    fn footer(&self) -> String {
        let compared = format!("Compared {} layout file(s)", self.files.len());
        let unsafe_part = match self.unsafe_count() {
            0 => "0 unsafe".green().to_string(),
            n => format!("{} unsafe", n).red().bold().to_string(),
        };
        let error_part = match self.error_count() {
            0 => "0 errors".normal().to_string(),
            n => format!("{} error(s)", n).yellow().to_string(),
        };
        format!("{}: {}, {}", compared, unsafe_part, error_part)
    }
}

impl Outputter for BatchReport {
    fn to_table(&self, config: &OutputConfig) -> String {
        let table = TableOutput::format_with_columns(&self.rows(), &Self::columns(), config);
        format!("{}\n{}", table, self.footer())
    }

    fn to_csv(&self, config: &OutputConfig) -> String {
        let columns: Vec<Column> = Self::columns()
            .into_iter()
            .map(|c| Column::new(c.key.clone(), c.key))
            .collect();
        CsvOutput::format_with_columns(&self.rows(), &columns, config)
    }
}

/// Pair, load and compare every layout file under the two roots.
pub fn collect(old_dir: &Path, new_dir: &Path, settings: &BatchSettings) -> anyhow::Result<Vec<PairOutcome>> {
    let scan = find_layout_pairs(
        old_dir,
        new_dir,
        Some(settings.extensions.as_slice()),
        &settings.ignore_patterns,
    )
    .context("Failed to scan layout directories")?;
    debug!(
        pairs = scan.len(),
        skipped = scan.skipped_count,
        duration_ms = scan.duration_ms,
        "layout files paired"
    );

    let mut pairs: Vec<LayoutPair> = Vec::with_capacity(scan.len());
    let mut outcomes: Vec<PairOutcome> = Vec::new();
    for file in &scan.pairs {
        match file.load() {
            Ok(pair) => pairs.push(pair),
            Err(err) => {
                warn!(file = %file.path, error = %err, "skipping unreadable layout file");
                outcomes.push(PairOutcome {
                    name: file.path.clone(),
                    result: Err(err),
                });
            }
        }
    }

    outcomes.extend(compare_many(&pairs, settings.threads));
    outcomes.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(outcomes)
}

/// Run the batch command
pub fn run(
    old_dir: &Path,
    new_dir: &Path,
    settings: BatchSettings,
    options: ReportOptions,
    config: OutputConfig,
) -> anyhow::Result<()> {
    let mut files = collect(old_dir, new_dir, &settings)?;

    if options.omit_new {
        files.retain(|f| match &f.result {
            Ok(result) => result.has_unsafe_findings(),
            Err(_) => true,
        });
    }

    let report = BatchReport {
        old_dir: old_dir.display().to_string(),
        new_dir: new_dir.display().to_string(),
        files,
    };
    let errors = report.error_count();
    let unsafe_files = report.unsafe_count();

    if !(options.omit_new && report.files.is_empty()) {
        Output::with_config(report, config).render()?;
    }

    if errors > 0 {
        anyhow::bail!("{} layout file(s) could not be compared", errors);
    }
    if options.strict && unsafe_files > 0 {
        anyhow::bail!("{} layout file(s) with unsafe storage changes", unsafe_files);
    }

    Ok(())
}
