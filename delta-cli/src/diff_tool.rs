//! Unified diff of the two layout views via the system `diff` utility.

use std::io::{self, Write};
use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;
use tempfile::NamedTempFile;
use thiserror::Error;

/// `diff` exit status meaning "inputs differ".
const EXIT_DIFFERENT: i32 = 1;

static NO_NEWLINE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\\ No newline at end of file\r?\n?").unwrap());

#[derive(Error, Debug)]
pub enum DiffToolError {
    #[error("failed to stage layout view for diff: {0}")]
    Stage(#[source] io::Error),

    #[error("failed to run `diff` (is it installed?): {0}")]
    Spawn(#[source] io::Error),

    #[error("`diff` exited with status {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

fn stage(contents: &str) -> Result<NamedTempFile, DiffToolError> {
    let mut file = NamedTempFile::new().map_err(DiffToolError::Stage)?;
    file.write_all(contents.as_bytes())
        .map_err(DiffToolError::Stage)?;
    file.flush().map_err(DiffToolError::Stage)?;
    Ok(file)
}

/// Drop `diff`'s missing-newline markers; the views never end with a newline.
pub fn clean_diff_output(raw: &str) -> String {
    NO_NEWLINE_MARKER.replace_all(raw, "").into_owned()
}

/// Run `diff -u` on two texts, labelling the hunks with the given names.
///
/// Returns an empty string when the texts are identical.
pub fn unified_diff(
    old_label: &str,
    new_label: &str,
    old_text: &str,
    new_text: &str,
    context: usize,
) -> Result<String, DiffToolError> {
    let old_file = stage(old_text)?;
    let new_file = stage(new_text)?;

    let output = Command::new("diff")
        .arg(format!("--unified={}", context))
        .arg("--label")
        .arg(old_label)
        .arg("--label")
        .arg(new_label)
        .arg(old_file.path())
        .arg(new_file.path())
        .output()
        .map_err(DiffToolError::Spawn)?;

    match output.status.code() {
        Some(0) | Some(EXIT_DIFFERENT) => {
            let raw = String::from_utf8_lossy(&output.stdout);
            Ok(clean_diff_output(&raw).trim_end().to_string())
        }
        code => Err(DiffToolError::Failed {
            status: code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }),
    }
}
