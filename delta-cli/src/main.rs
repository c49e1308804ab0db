//! storage-delta - Storage layout diffs for upgradeable Solidity contracts
//!
//! Compares the compiler's `storageLayout` output before and after an upgrade
//! and flags every variable whose storage is no longer where the deployed
//! proxy expects it.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod diff_tool;
mod output;

use commands::batch::BatchSettings;
use commands::compare::ReportOptions;
use commands::*;
use config::DeltaConfig;
use output::{OutputConfig, OutputFormat};

/// Storage layout diffs for upgradeable contracts.
#[derive(Parser)]
#[command(name = "storage-delta")]
#[command(author, version)]
#[command(about = "Storage layout diffs for upgradeable contracts")]
#[command(
    long_about = "Compares two solc storageLayout outputs and reports variables that were\nremoved, moved, or now overlap bytes that still hold old data."
)]
#[command(propagate_version = true)]
#[command(after_help = "Markers:
  🏴  problematic          new variable lands on bytes used by something else
  🏳️  moved                variable relocated to free bytes
  🏁  moved & problematic  variable relocated onto used bytes
  🪦  removed              old variable no longer starts here
  🌱  new                  fresh variable on free bytes

Examples:
  storage-delta compare old/Vault.json new/Vault.json
  storage-delta compare old.json new.json --format diff
  storage-delta batch layouts/v1 layouts/v2 --strict")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format (overrides config default)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// Minified JSON and borderless tables
    #[arg(long, global = true)]
    compact: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two storageLayout JSON files
    #[command(visible_alias = "c")]
    Compare {
        /// Layout before the upgrade
        old: PathBuf,

        /// Layout after the upgrade
        new: PathBuf,

        /// Print nothing unless there is an unsafe finding
        #[arg(long)]
        omit_new: bool,

        /// Exit with an error when unsafe findings exist
        #[arg(long)]
        strict: bool,

        /// Context lines for --format diff
        #[arg(short = 'U', long)]
        context: Option<usize>,
    },

    /// Compare every layout file of two directory trees
    #[command(visible_alias = "b")]
    Batch {
        /// Directory with the layouts before the upgrade
        old_dir: PathBuf,

        /// Directory with the layouts after the upgrade
        new_dir: PathBuf,

        /// Worker threads (defaults to one per CPU)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Only list files with unsafe findings or errors
        #[arg(long)]
        omit_new: bool,

        /// Exit with an error when any file has unsafe findings
        #[arg(long)]
        strict: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,

        /// Show installation instructions instead of generating completions
        #[arg(long)]
        instructions: bool,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = DeltaConfig::load(Path::new("."));

    // CLI flag > config default > Table
    let format = cli.format.unwrap_or_else(|| {
        config
            .default_format()
            .and_then(|f| f.parse().ok())
            .unwrap_or(OutputFormat::Table)
    });

    let mut output_config =
        OutputConfig::auto_detect_with_color_override(format, config.use_color());
    if cli.compact || config.compact() {
        output_config = output_config.compact();
    }
    colored::control::set_override(output_config.use_colors());

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            let _ = Cli::command().print_help();
            println!();
            return Ok(());
        }
    };

    match command {
        Commands::Compare {
            old,
            new,
            omit_new,
            strict,
            context,
        } => {
            let options = ReportOptions {
                omit_new: omit_new || config.omit_new(),
                strict,
                context: context.unwrap_or_else(|| config.context_lines()),
            };
            compare::run(&old, &new, options, output_config)
        }
        Commands::Batch {
            old_dir,
            new_dir,
            threads,
            omit_new,
            strict,
        } => {
            let settings = BatchSettings {
                extensions: config.extensions(),
                ignore_patterns: config.ignore_patterns(),
                threads: threads.or_else(|| config.threads()),
            };
            let options = ReportOptions {
                omit_new: omit_new || config.omit_new(),
                strict,
                context: config.context_lines(),
            };
            batch::run(&old_dir, &new_dir, settings, options, output_config)
        }
        Commands::Completions {
            shell,
            instructions,
        } => {
            let mut cmd = Cli::command();
            completions::run(shell, instructions, &mut cmd, output_config)
        }
    }
}
