//! Command-line interface definitions for uniqsort.
//!
//! Global options (verbosity, color, log file, config file) apply to every
//! subcommand.
//!
//! # Example
//!
//! ```bash
//! # Sort ~/Pictures into ~/Sorted/UniqueFiles and ~/Sorted/DuplicateFiles
//! uniqsort scan ~/Pictures --output-dir ~/Sorted
//!
//! # Only PNG and anything with an image/ MIME type, no category folders
//! uniqsort scan ~/Pictures -o ~/Sorted --ext .png --ext image/ --no-categories
//!
//! # Show what is recorded so far, then forget it
//! uniqsort status -o ~/Sorted
//! uniqsort clear -o ~/Sorted
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Resumable content-based deduplicator.
///
/// Copies every file under a root into a unique tree or a duplicate tree
/// according to its SHA-256 fingerprint. Source files are never modified,
/// and an interrupted run picks up where it stopped.
#[derive(Debug, Parser)]
#[command(name = "uniqsort")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Also write log records to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sort a directory into unique and duplicate trees
    Scan(ScanArgs),
    /// Forget all recorded fingerprints, visited paths and progress
    Clear(StateArgs),
    /// Show what the store has recorded so far
    Status(StatusArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory to scan
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Output root holding UniqueFiles/ and DuplicateFiles/
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Eligible extension or MIME prefix (repeatable, or comma separated)
    ///
    /// Entries containing '/' are MIME prefixes, e.g. "image/".
    #[arg(short = 'e', long = "ext", value_name = "EXT", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Classify and record without copying anything
    ///
    /// Files are still recorded and marked visited, so a later real run
    /// will not copy them. Run `uniqsort clear` first to undo.
    #[arg(long)]
    pub dry_run: bool,

    /// Clear the store and progress record before scanning
    #[arg(long)]
    pub clear_state: bool,

    /// Read chunk size (e.g. 64KiB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub chunk_size: Option<u64>,

    /// Put everything directly into UniqueFiles/ and DuplicateFiles/
    #[arg(long)]
    pub no_categories: bool,

    /// Include hidden files and directories
    #[arg(long)]
    pub include_hidden: bool,

    /// Free space to keep on the destination disk (e.g. 100MiB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub disk_margin: Option<u64>,

    /// Directory for the fingerprint store and progress record
    #[arg(long, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Do not draw a progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Format of the final report on stdout
    #[arg(long, value_enum, default_value = "text")]
    pub report: ReportFormat,
}

/// Arguments for subcommands that only touch the state.
#[derive(Debug, Args)]
pub struct StateArgs {
    /// Output root the state belongs to
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Directory for the fingerprint store and progress record
    #[arg(long, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,
}

/// Arguments for the status subcommand.
#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Which state to inspect
    #[command(flatten)]
    pub state: StateArgs,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub report: ReportFormat,
}

/// Format for the final report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable summary
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Text => write!(f, "text"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use uniqsort::cli::parse_size;
///
/// assert_eq!(parse_size("65536").unwrap(), 65_536);
/// assert_eq!(parse_size("64KiB").unwrap(), 65_536);
/// assert_eq!(parse_size("100MiB").unwrap(), 104_857_600);
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
