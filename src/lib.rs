//! uniqsort - resumable content-based deduplicator
//!
//! Walks a directory tree, fingerprints every eligible file with SHA-256 and
//! copies it into `UniqueFiles/` the first time its content is seen, or into
//! `DuplicateFiles/` afterwards. Source files are never modified. Every
//! fingerprint and every handled path is kept in a SQLite store, so an
//! interrupted run resumes where it stopped and a rerun copies nothing twice.
//!
//! # Modules
//!
//! * [`scanner`]: walking, eligibility, fingerprints
//! * [`store`]: durable fingerprint store and progress record
//! * [`dedupe`]: classification, placement and the scan driver
//! * [`output`]: text and JSON reports

pub mod cli;
pub mod config;
pub mod dedupe;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod store;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::{Cli, Commands, ReportFormat, ScanArgs, StateArgs, StatusArgs};
use crate::config::Config;
use crate::dedupe::Orchestrator;
use crate::error::ExitCode;
use crate::output::{JsonOutput, StoreStatus};
use crate::progress::{NoProgress, Progress, ProgressSink};
use crate::store::{FingerprintStore, ProgressRecord, StatePaths};

/// Run the application for parsed command-line arguments.
///
/// # Errors
///
/// Returns an error for fatal failures: bad configuration, a missing scan
/// root, or a store that cannot be opened. Per-file failures are reported
/// through [`ExitCode::PartialSuccess`] instead.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())
        .context("Failed to open log file")?;

    if cli.no_color {
        yansi::disable();
    }

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan(args) => run_scan(&args, config, cli.quiet),
        Commands::Clear(args) => run_clear(&args, &config),
        Commands::Status(args) => run_status(&args, &config),
    }
}

fn run_scan(args: &ScanArgs, mut config: Config, quiet: bool) -> Result<ExitCode> {
    config.apply_scan_args(args);
    config.validate().context("Invalid configuration")?;

    let output_root = config.output_root.clone().context(
        "No output directory given; use --output-dir or set output_root in the config file",
    )?;
    let paths = StatePaths::resolve(config.state_dir.as_deref(), &output_root);

    let mut store = FingerprintStore::open(&paths.database)
        .with_context(|| format!("Failed to open store at {}", paths.database.display()))?;

    if args.clear_state {
        clear_state(&mut store, &paths)?;
    }

    if args.dry_run {
        log::warn!(
            "Dry run: nothing is copied, but fingerprints and visited paths are still recorded. \
             A later real run will skip these files unless `uniqsort clear` is run first."
        );
    }

    let scan_config = config
        .scan_config()
        .with_dry_run(args.dry_run)
        .with_progress_file(paths.progress.clone());

    let cancel = signal::install_handler()?;
    let sink: Arc<dyn ProgressSink> = if quiet || args.no_progress {
        Arc::new(NoProgress)
    } else {
        Arc::new(Progress::new(false))
    };

    let report = Orchestrator::new(&store, scan_config)
        .with_progress(sink)
        .with_cancel_token(cancel)
        .run(&args.root, &output_root)?;

    store.close().context("Failed to close store")?;

    let exit_code = if report.has_errors() {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    };

    let mut stdout = std::io::stdout().lock();
    match args.report {
        ReportFormat::Json => JsonOutput::new(&report, exit_code).write_to(&mut stdout)?,
        ReportFormat::Text => {
            if !quiet {
                write!(stdout, "{}", output::text::render_report(&report))?;
            }
        }
    }

    Ok(exit_code)
}

fn run_clear(args: &StateArgs, config: &Config) -> Result<ExitCode> {
    let paths = state_paths(args, config)?;
    let mut store = FingerprintStore::open(&paths.database)
        .with_context(|| format!("Failed to open store at {}", paths.database.display()))?;
    clear_state(&mut store, &paths)?;
    store.close()?;
    Ok(ExitCode::Success)
}

fn run_status(args: &StatusArgs, config: &Config) -> Result<ExitCode> {
    let paths = state_paths(&args.state, config)?;
    let state_dir = paths
        .database
        .parent()
        .map_or_else(PathBuf::new, Path::to_path_buf);

    let (records, visited) = if paths.database.exists() {
        let store = FingerprintStore::open(&paths.database)
            .with_context(|| format!("Failed to open store at {}", paths.database.display()))?;
        let counts = (store.record_count()?, store.visited_count()?);
        store.close()?;
        counts
    } else {
        log::debug!("No store at {}", paths.database.display());
        (0, 0)
    };

    let progress = ProgressRecord::load_lenient(&paths.progress);

    let status = StoreStatus {
        state_dir,
        records,
        visited,
        progress,
    };

    let mut stdout = std::io::stdout().lock();
    match args.report {
        ReportFormat::Json => output::json::write_status(&status, &mut stdout)?,
        ReportFormat::Text => write!(stdout, "{}", output::text::render_status(&status))?,
    }
    Ok(ExitCode::Success)
}

fn state_paths(args: &StateArgs, config: &Config) -> Result<StatePaths> {
    let state_dir = args.state_dir.clone().or_else(|| config.state_dir.clone());
    let output_root = args
        .output_dir
        .clone()
        .or_else(|| config.output_root.clone());

    match (state_dir, output_root) {
        (Some(state_dir), _) => Ok(StatePaths::in_dir(&state_dir)),
        (None, Some(output_root)) => Ok(StatePaths::resolve(None, &output_root)),
        (None, None) => anyhow::bail!("Specify --output-dir or --state-dir"),
    }
}

fn clear_state(store: &mut FingerprintStore, paths: &StatePaths) -> Result<()> {
    store.clear().context("Failed to clear store")?;
    ProgressRecord::remove(&paths.progress)?;
    log::info!("Cleared recorded fingerprints, visited paths and progress");
    Ok(())
}
