//! Progress reporting utilities using indicatif.
//!
//! The scan reports `(processed, total)` through [`ProgressSink`]; how that
//! is rendered is up to the implementation. [`Progress`] draws a terminal
//! bar, [`NoProgress`] discards everything.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Receiver for scan progress updates.
pub trait ProgressSink: Send + Sync {
    /// Called once the candidate count is known.
    fn on_start(&self, total: u64);

    /// Called after each candidate has been handled.
    ///
    /// # Arguments
    ///
    /// * `processed` - Candidates handled so far (1-based)
    /// * `total` - Candidates discovered by the walk
    /// * `path` - Candidate just handled
    fn on_file(&self, processed: u64, total: u64, path: &Path);

    /// Called when the scan stops, whether complete or interrupted.
    fn on_finish(&self, interrupted: bool);
}

/// Sink that ignores all updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_start(&self, _total: u64) {}
    fn on_file(&self, _processed: u64, _total: u64, _path: &Path) {}
    fn on_finish(&self, _interrupted: bool) {}
}

/// Terminal progress bar.
pub struct Progress {
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bar is displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use uniqsort::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            quiet,
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

impl ProgressSink for Progress {
    fn on_start(&self, total: u64) {
        if self.quiet {
            return;
        }
        let pb = ProgressBar::new(total);
        pb.set_style(Self::style());
        pb.set_message("Sorting files");
        pb.enable_steady_tick(Duration::from_millis(200));
        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(pb);
        }
    }

    fn on_file(&self, processed: u64, total: u64, path: &Path) {
        self.with_bar(|pb| {
            if pb.length() != Some(total) {
                pb.set_length(total);
            }
            pb.set_position(processed);
            pb.set_message(truncate_path(path, 30));
        });
    }

    fn on_finish(&self, interrupted: bool) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                if interrupted {
                    pb.abandon_with_message("Interrupted");
                } else {
                    pb.finish_with_message("Done");
                }
            }
        }
    }
}

/// Shorten a path for display in the progress bar.
///
/// Keeps the file name, trimmed from the left on a character boundary.
fn truncate_path(path: &Path, max_len: usize) -> String {
    let full = path.to_string_lossy();
    if full.chars().count() <= max_len {
        return full.into_owned();
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let count = file_name.chars().count();

    if count + 4 > max_len {
        let keep = max_len.saturating_sub(3);
        let tail: String = file_name.chars().skip(count.saturating_sub(keep)).collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
