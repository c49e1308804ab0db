//! Integration tests for the storage-delta CLI
//!
//! Runs the built binary against layout files written to temporary directories.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

fn delta_binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_storage-delta"))
}

/// Run storage-delta with the given args in the specified directory
fn run_delta(dir: &Path, args: &[&str]) -> Output {
    delta_binary()
        .current_dir(dir)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute storage-delta")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn write_layout(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create layout directory");
    }
    fs::write(&path, content).expect("Failed to write layout file");
    path
}

const TYPES: &str = r#""types": {
    "t_address": {"encoding": "inplace", "label": "address", "numberOfBytes": "20"},
    "t_bool": {"encoding": "inplace", "label": "bool", "numberOfBytes": "1"},
    "t_uint256": {"encoding": "inplace", "label": "uint256", "numberOfBytes": "32"}
}"#;

fn layout(storage: &str) -> String {
    format!(r#"{{"storage": [{}], {}}}"#, storage, TYPES)
}

fn token_v1() -> String {
    layout(
        r#"{"astId": 3, "contract": "Token.sol:Token", "label": "owner", "offset": 0, "slot": "0", "type": "t_address"},
           {"astId": 5, "contract": "Token.sol:Token", "label": "supply", "offset": 0, "slot": "1", "type": "t_uint256"}"#,
    )
}

/// `supply` dropped
fn token_removed() -> String {
    layout(
        r#"{"astId": 3, "contract": "Token.sol:Token", "label": "owner", "offset": 0, "slot": "0", "type": "t_address"}"#,
    )
}

/// `paused` packed after `owner`, nothing else touched
fn token_appended() -> String {
    layout(
        r#"{"astId": 3, "contract": "Token.sol:Token", "label": "owner", "offset": 0, "slot": "0", "type": "t_address"},
           {"astId": 4, "contract": "Token.sol:Token", "label": "paused", "offset": 20, "slot": "0", "type": "t_bool"},
           {"astId": 5, "contract": "Token.sol:Token", "label": "supply", "offset": 0, "slot": "1", "type": "t_uint256"}"#,
    )
}

/// `owner` renamed in place
fn token_renamed() -> String {
    layout(
        r#"{"astId": 3, "contract": "Token.sol:Token", "label": "admin", "offset": 0, "slot": "0", "type": "t_address"},
           {"astId": 5, "contract": "Token.sol:Token", "label": "supply", "offset": 0, "slot": "1", "type": "t_uint256"}"#,
    )
}

// ============================================================================
// Compare Command Tests
// ============================================================================

#[test]
fn test_compare_identical_layouts() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_layout(temp_dir.path(), "old.json", &token_v1());
    write_layout(temp_dir.path(), "new.json", &token_v1());

    let output = run_delta(temp_dir.path(), &["compare", "old.json", "new.json"]);

    assert!(output.status.success(), "compare should succeed: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "No storage layout changes.");
}

#[test]
fn test_compare_removed_variable() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_layout(temp_dir.path(), "old.json", &token_v1());
    write_layout(temp_dir.path(), "new.json", &token_removed());

    let output = run_delta(temp_dir.path(), &["compare", "old.json", "new.json"]);

    assert!(output.status.success(), "compare without --strict should succeed");
    let stdout_str = stdout(&output);
    assert!(stdout_str.contains("🪦"), "Should mark the removed variable: {}", stdout_str);
    assert!(stdout_str.contains("supply"));
    assert!(stdout_str.contains("UNSAFE:"), "Should flag the report: {}", stdout_str);
}

#[test]
fn test_compare_strict_fails_on_unsafe_findings() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_layout(temp_dir.path(), "old.json", &token_v1());
    write_layout(temp_dir.path(), "new.json", &token_renamed());

    let output = run_delta(
        temp_dir.path(),
        &["compare", "old.json", "new.json", "--strict"],
    );

    assert!(!output.status.success(), "--strict should fail on a rename");
    assert!(stdout(&output).contains("🏴"));
    assert!(
        stderr(&output).contains("unsafe storage layout finding"),
        "Should explain the failure, got: {}",
        stderr(&output)
    );
}

#[test]
fn test_compare_strict_passes_on_safe_append() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_layout(temp_dir.path(), "old.json", &token_v1());
    write_layout(temp_dir.path(), "new.json", &token_appended());

    let output = run_delta(
        temp_dir.path(),
        &["compare", "old.json", "new.json", "--strict"],
    );

    assert!(output.status.success(), "appending into free bytes is safe");
    let stdout_str = stdout(&output);
    assert!(stdout_str.contains("🌱"));
    assert!(stdout_str.contains("SAFE:"));
}

#[test]
fn test_compare_omit_new_prints_nothing_when_safe() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_layout(temp_dir.path(), "old.json", &token_v1());
    write_layout(temp_dir.path(), "new.json", &token_appended());

    let output = run_delta(
        temp_dir.path(),
        &["compare", "old.json", "new.json", "--omit-new"],
    );

    assert!(output.status.success());
    assert!(
        stdout(&output).is_empty(),
        "Safe changes should be omitted, got: {}",
        stdout(&output)
    );
}

#[test]
fn test_compare_omit_new_still_reports_unsafe() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_layout(temp_dir.path(), "old.json", &token_v1());
    write_layout(temp_dir.path(), "new.json", &token_removed());

    let output = run_delta(
        temp_dir.path(),
        &["compare", "old.json", "new.json", "--omit-new"],
    );

    assert!(output.status.success());
    assert!(stdout(&output).contains("🪦"));
}

#[test]
fn test_compare_json_format() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_layout(temp_dir.path(), "old.json", &token_v1());
    write_layout(temp_dir.path(), "new.json", &token_removed());

    let output = run_delta(
        temp_dir.path(),
        &["compare", "old.json", "new.json", "--format", "json"],
    );

    assert!(output.status.success(), "--format json should succeed");
    let stdout_str = stdout(&output);
    let json: serde_json::Value =
        serde_json::from_str(&stdout_str).expect("Output should be valid JSON");

    assert_eq!(json["old_path"], "old.json");
    assert_eq!(json["new_path"], "new.json");
    assert_eq!(json["result"]["summary"]["removed"], 1);
    assert!(json["result"]["entries"].is_array());
}

#[test]
fn test_compare_compact_json_is_single_line() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_layout(temp_dir.path(), "old.json", &token_v1());
    write_layout(temp_dir.path(), "new.json", &token_removed());

    let output = run_delta(
        temp_dir.path(),
        &["compare", "old.json", "new.json", "--format", "json", "--compact"],
    );

    assert!(output.status.success(), "--compact should succeed");
    let stdout_str = stdout(&output);
    assert_eq!(stdout_str.trim_end().lines().count(), 1, "got: {}", stdout_str);
    let json: serde_json::Value =
        serde_json::from_str(&stdout_str).expect("Output should be valid JSON");
    assert_eq!(json["result"]["summary"]["removed"], 1);
}

#[test]
fn test_config_compact_borderless_table() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_layout(temp_dir.path(), "old.json", &token_v1());
    write_layout(temp_dir.path(), "new.json", &token_removed());
    fs::write(
        temp_dir.path().join(".deltarc.toml"),
        "[output]\ncompact = true\n",
    )
    .expect("Failed to write config");

    let output = run_delta(temp_dir.path(), &["compare", "old.json", "new.json"]);

    assert!(output.status.success());
    let stdout_str = stdout(&output);
    assert!(stdout_str.contains("old.json (old)"));
    assert!(!stdout_str.contains('╭'), "compact tables have no border, got: {}", stdout_str);
}

#[test]
fn test_compare_csv_format() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_layout(temp_dir.path(), "old.json", &token_v1());
    write_layout(temp_dir.path(), "new.json", &token_appended());

    let output = run_delta(
        temp_dir.path(),
        &["compare", "old.json", "new.json", "--format", "csv"],
    );

    assert!(output.status.success(), "--format csv should succeed");
    let stdout_str = stdout(&output);
    let lines: Vec<&str> = stdout_str.lines().collect();
    assert!(lines[0].starts_with("classification,slot,offset,label,type"));
    assert!(
        lines.iter().any(|l| l.starts_with("new,0,20,paused,bool")),
        "Should list the new variable, got: {}",
        stdout_str
    );
}

#[cfg(unix)]
#[test]
fn test_compare_diff_format() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_layout(temp_dir.path(), "old.json", &token_v1());
    write_layout(temp_dir.path(), "new.json", &token_renamed());

    let output = run_delta(
        temp_dir.path(),
        &["compare", "old.json", "new.json", "--format", "diff"],
    );

    assert!(output.status.success(), "diff format failed: {}", stderr(&output));
    let stdout_str = stdout(&output);
    assert!(stdout_str.starts_with("--- old.json"), "got: {}", stdout_str);
    assert!(stdout_str.contains("+++ new.json"));
    assert!(stdout_str.contains("@@"));
    assert!(stdout_str.contains("admin"));
}

#[test]
fn test_compare_invalid_json_reports_path() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_layout(temp_dir.path(), "old.json", &token_v1());
    write_layout(temp_dir.path(), "broken.json", "{\"storage\": [");

    let output = run_delta(temp_dir.path(), &["compare", "old.json", "broken.json"]);

    assert!(!output.status.success(), "invalid JSON should fail");
    assert!(
        stderr(&output).contains("broken.json"),
        "Error should name the file, got: {}",
        stderr(&output)
    );
}

#[test]
fn test_compare_missing_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_layout(temp_dir.path(), "old.json", &token_v1());

    let output = run_delta(temp_dir.path(), &["compare", "old.json", "nope.json"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("nope.json"));
}

#[test]
fn test_config_default_format() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_layout(temp_dir.path(), "old.json", &token_v1());
    write_layout(temp_dir.path(), "new.json", &token_v1());
    fs::write(
        temp_dir.path().join(".deltarc.toml"),
        "[output]\nformat = \"json\"\n",
    )
    .expect("Failed to write config");

    let output = run_delta(temp_dir.path(), &["compare", "old.json", "new.json"]);

    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("Config should select JSON output");
    assert_eq!(json["result"]["entries"].as_array().map(Vec::len), Some(0));
    assert_eq!(json["result"]["summary_text"], "No changes");
}

// ============================================================================
// Batch Command Tests
// ============================================================================

fn setup_batch_trees(root: &Path) {
    write_layout(root, "v1/Token.json", &token_v1());
    write_layout(root, "v2/Token.json", &token_appended());
    write_layout(root, "v1/governance/Vault.json", &token_v1());
    write_layout(root, "v2/governance/Vault.json", &token_renamed());
}

#[test]
fn test_batch_reports_every_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    setup_batch_trees(temp_dir.path());

    let output = run_delta(temp_dir.path(), &["batch", "v1", "v2", "--format", "csv"]);

    assert!(output.status.success(), "batch should succeed: {}", stderr(&output));
    let stdout_str = stdout(&output);
    let lines: Vec<&str> = stdout_str.lines().collect();
    assert_eq!(lines[0], "file,status,unsafe_findings,dirty_bytes,summary");
    assert!(lines[1].starts_with("Token.json,changed,0,"), "got: {}", stdout_str);
    assert!(lines[2].starts_with("governance/Vault.json,unsafe,1,"), "got: {}", stdout_str);
}

#[test]
fn test_batch_strict_fails_on_unsafe_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    setup_batch_trees(temp_dir.path());

    let output = run_delta(temp_dir.path(), &["batch", "v1", "v2", "--strict"]);

    assert!(!output.status.success(), "--strict should fail");
    assert!(stdout(&output).contains("1 unsafe"));
}

#[test]
fn test_batch_broken_file_is_reported_inline() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    setup_batch_trees(temp_dir.path());
    write_layout(temp_dir.path(), "v2/Broken.json", "not json");

    let output = run_delta(temp_dir.path(), &["batch", "v1", "v2", "--format", "csv"]);

    assert!(!output.status.success(), "a broken file should fail the batch");
    let stdout_str = stdout(&output);
    assert!(
        stdout_str.lines().any(|l| l.starts_with("Broken.json,error,")),
        "Should list the broken file, got: {}",
        stdout_str
    );
    assert!(stdout_str.contains("governance/Vault.json,unsafe"));
    assert!(stderr(&output).contains("could not be compared"));
}

#[test]
fn test_batch_missing_root() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_layout(temp_dir.path(), "v1/Token.json", &token_v1());

    let output = run_delta(temp_dir.path(), &["batch", "v1", "v9"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("v9"));
}

// ============================================================================
// Completions and Help
// ============================================================================

#[test]
fn test_completions_bash() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = run_delta(temp_dir.path(), &["completions", "bash"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("storage-delta"));
}

#[test]
fn test_completions_instructions() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = run_delta(temp_dir.path(), &["completions", "zsh", "--instructions"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("fpath"));
}

#[test]
fn test_help_lists_commands() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = run_delta(temp_dir.path(), &["--help"]);

    assert!(output.status.success());
    let stdout_str = stdout(&output);
    for command in ["compare", "batch", "completions"] {
        assert!(stdout_str.contains(command), "help should list {}", command);
    }
}

#[test]
fn test_version_flag() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = run_delta(temp_dir.path(), &["--version"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("storage-delta"));
}
