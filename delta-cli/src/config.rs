//! Configuration loading from `.deltarc.toml`.
//!
//! Configuration is optional. Without a config file every setting falls back
//! to its default, and command-line flags always win over the file.
//!
//! # Example Configuration
//!
//! ```toml
//! [output]
//! format = "diff"
//! color = false
//! compact = true
//!
//! [report]
//! omit_new = true
//! context = 5
//!
//! [scanner]
//! ignore = ["broadcast/"]
//! extensions = ["json"]
//!
//! [parallel]
//! threads = 4
//! ```

use serde::Deserialize;
use std::path::Path;

/// File name searched for in the working directory.
pub const CONFIG_FILENAME: &str = ".deltarc.toml";

/// Root configuration structure loaded from `.deltarc.toml`.
///
/// All sections are optional and will use defaults if not specified.
#[derive(Debug, Deserialize, Default)]
pub struct DeltaConfig {
    /// Output formatting preferences.
    #[serde(default)]
    pub output: OutputSettings,

    /// Report contents.
    #[serde(default)]
    pub report: ReportConfig,

    /// Layout file discovery for `batch`.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Worker pool for `batch`.
    #[serde(default)]
    pub parallel: ParallelConfig,
}

/// Output formatting preferences.
///
/// Command-line flags (e.g., `--format json`) override these settings.
#[derive(Debug, Deserialize, Default)]
pub struct OutputSettings {
    /// Default output format.
    ///
    /// Valid values: `table`, `json`, `csv`, `diff`
    /// Default: `table`
    #[serde(default)]
    pub format: Option<String>,

    /// Whether to use colored output.
    ///
    /// Defaults to auto-detection when unset.
    #[serde(default)]
    pub color: Option<bool>,

    /// Minified JSON and borderless tables.
    #[serde(default)]
    pub compact: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReportConfig {
    /// Print nothing when the only findings are new variables.
    #[serde(default)]
    pub omit_new: bool,

    /// Context lines for the unified diff.
    #[serde(default = "default_context")]
    pub context: usize,
}

fn default_context() -> usize {
    3
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            omit_new: false,
            context: default_context(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct ScannerConfig {
    /// Additional glob patterns to ignore during scanning.
    ///
    /// These patterns are combined with built-in defaults (`.git/`, `node_modules/`, etc.)
    /// and any `.gitignore` / `.deltaignore` rules.
    #[serde(default)]
    pub ignore: Vec<String>,

    /// File extensions treated as layout files. Defaults to `["json"]`.
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ParallelConfig {
    /// Rayon pool size. Unset means one thread per CPU.
    #[serde(default)]
    pub threads: Option<usize>,
}

/// Default ignore patterns that are always included.
const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git/",
    "node_modules/",
    "target/",
    "out/",   // forge build output
    "cache/", // forge cache
];

const DEFAULT_EXTENSIONS: &[&str] = &["json"];

impl DeltaConfig {
    /// Load configuration from `.deltarc.toml` in the given directory.
    ///
    /// If the config file doesn't exist or can't be parsed, returns defaults.
    /// Parse errors are logged as warnings but don't cause failures.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILENAME);
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", CONFIG_FILENAME, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", CONFIG_FILENAME, e);
                }
            }
        }
        Self::default()
    }

    /// Get ignore patterns for the scanner, with defaults included.
    ///
    /// User patterns come first; defaults are appended unless already present.
    pub fn ignore_patterns(&self) -> Vec<String> {
        let mut patterns = self.scanner.ignore.clone();

        for default in DEFAULT_IGNORE_PATTERNS {
            if !patterns.iter().any(|p| p == default) {
                patterns.push(default.to_string());
            }
        }

        patterns
    }

    /// Extensions of layout files, without leading dots.
    pub fn extensions(&self) -> Vec<String> {
        match &self.scanner.extensions {
            Some(exts) if !exts.is_empty() => exts.clone(),
            _ => DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Get the default output format, if configured.
    pub fn default_format(&self) -> Option<&str> {
        self.output.format.as_deref()
    }

    /// Returns the configured value, or `None` to use auto-detection.
    pub fn use_color(&self) -> Option<bool> {
        self.output.color
    }

    pub fn compact(&self) -> bool {
        self.output.compact
    }

    pub fn omit_new(&self) -> bool {
        self.report.omit_new
    }

    pub fn context_lines(&self) -> usize {
        self.report.context
    }

    pub fn threads(&self) -> Option<usize> {
        self.parallel.threads
    }
}
