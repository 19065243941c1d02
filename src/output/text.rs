//! Human-readable summaries.

use std::fmt::Write as _;

use bytesize::ByteSize;
use yansi::Paint;

use super::StoreStatus;
use crate::dedupe::ScanReport;

/// Render the end-of-run summary.
#[must_use]
pub fn render_report(report: &ScanReport) -> String {
    let mut out = String::new();

    let headline = if report.interrupted {
        "Scan interrupted".yellow().bold().to_string()
    } else if report.dry_run {
        "Dry run complete".cyan().bold().to_string()
    } else {
        "Scan complete".green().bold().to_string()
    };
    let _ = writeln!(out, "{headline}");
    let _ = writeln!(out, "  Root:             {}", report.root.display());
    let _ = writeln!(out, "  Output:           {}", report.output_root.display());
    let _ = writeln!(
        out,
        "  Processed:        {} of {}",
        report.processed, report.total_candidates
    );
    let _ = writeln!(out, "  Unique:           {}", report.unique.green());
    let _ = writeln!(out, "  Duplicates:       {}", report.duplicates.yellow());
    let _ = writeln!(out, "  Already handled:  {}", report.already_visited);

    if report.collisions > 0 {
        let _ = writeln!(out, "  Hash collisions:  {}", report.collisions.magenta());
    }
    if report.symlinks_skipped > 0 {
        let _ = writeln!(out, "  Symlinks skipped: {}", report.symlinks_skipped);
    }
    if report.has_errors() {
        let _ = writeln!(
            out,
            "  Errors:           {}",
            (report.errors + report.walk_errors).red().bold()
        );
    }
    if !report.dry_run {
        let _ = writeln!(out, "  Copied:           {}", ByteSize(report.bytes_copied));
    }
    let _ = writeln!(
        out,
        "  Duration:         {:.2}s",
        report.duration_ms as f64 / 1000.0
    );

    if report.interrupted {
        let _ = writeln!(
            out,
            "{}",
            "Run the same command again to continue where this run stopped.".dim()
        );
    }
    out
}

/// Render the `status` command output.
#[must_use]
pub fn render_status(status: &StoreStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Store status".bold());
    let _ = writeln!(out, "  State directory:  {}", status.state_dir.display());
    let _ = writeln!(out, "  Fingerprints:     {}", status.records);
    let _ = writeln!(out, "  Visited files:    {}", status.visited);

    match &status.progress {
        Some(progress) => {
            let state = if progress.completed {
                "completed".green().to_string()
            } else {
                "incomplete".yellow().to_string()
            };
            let _ = writeln!(
                out,
                "  Last run:         {} of {} ({:.0}%) in {}, {}",
                progress.processed,
                progress.total_candidates,
                progress.fraction() * 100.0,
                progress.root.display(),
                state
            );
            let _ = writeln!(
                out,
                "  Updated:          {}",
                progress.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        None => {
            let _ = writeln!(out, "  Last run:         none recorded");
        }
    }
    out
}
