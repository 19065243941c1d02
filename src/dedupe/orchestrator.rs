//! Scan orchestration: walk, classify, place, copy.
//!
//! # Overview
//!
//! [`Orchestrator::run`] drives one pass over a root directory:
//!
//! 1. **Discover** - walk the root (never following symlinks, never entering
//!    the output tree) and keep eligible files.
//! 2. **Classify** - ask the [`Classifier`] whether each file is unique or a
//!    duplicate.
//! 3. **Place** - pick a collision-free destination name.
//! 4. **Copy** - check free space, note the destination in the store, copy
//!    through a temp file, then mark the file visited. A file whose noted
//!    destination already holds its bytes is not copied again.
//!
//! Exactly one file is in flight at any time. The cancel token is checked
//! between files; an interrupted run finishes the current file, flushes the
//! progress record and returns a report marked `interrupted`.
//!
//! A dry run performs every step except the copy, so the store ends up in
//! the same state a real run would leave it in.
//!
//! # Example
//!
//! ```no_run
//! use uniqsort::dedupe::{Orchestrator, ScanConfig};
//! use uniqsort::store::FingerprintStore;
//! use std::path::Path;
//!
//! let store = FingerprintStore::open(Path::new("/out/.uniqsort/fingerprints.db")).unwrap();
//! let config = ScanConfig::default().with_extensions([".jpg", ".png"]);
//! let report = Orchestrator::new(&store, config)
//!     .run(Path::new("/photos"), Path::new("/out"))
//!     .unwrap();
//! println!("{} unique, {} duplicates", report.unique, report.duplicates);
//! ```

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use filetime::FileTime;
use serde::Serialize;
use sysinfo::Disks;

use super::classifier::{Classification, Classifier};
use super::placement::{PlacementPlanner, DUPLICATE_DIR, UNIQUE_DIR};
use crate::error::FileError;
use crate::progress::{NoProgress, ProgressSink};
use crate::scanner::hasher::{bounded_chunk_size, DEFAULT_CHUNK_SIZE};
use crate::scanner::{
    CategoryTable, EligibilityFilter, FileEntry, Fingerprinter, Hasher, Walker, WalkerConfig,
};
use crate::signal::CancelToken;
use crate::store::{FingerprintStore, ProgressRecord};

/// Progress record is flushed every this many files.
pub const SAVE_INTERVAL: u64 = 10;

/// Default free space kept on the destination disk (100 MiB).
pub const DEFAULT_DISK_MARGIN: u64 = 100 * 1024 * 1024;

/// Reports free space for the filesystem holding a path.
pub trait SpaceProbe {
    /// Bytes available at `path`, or `None` if unknown.
    fn available_space(&mut self, path: &Path) -> Option<u64>;
}

impl<F: FnMut(&Path) -> Option<u64>> SpaceProbe for F {
    fn available_space(&mut self, path: &Path) -> Option<u64> {
        self(path)
    }
}

/// Free space from the mounted disk list.
pub struct SysinfoProbe {
    disks: Disks,
}

impl SysinfoProbe {
    /// Load the current disk list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            disks: Disks::new_with_refreshed_list(),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SpaceProbe for SysinfoProbe {
    fn available_space(&mut self, path: &Path) -> Option<u64> {
        self.disks.refresh();
        let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

        // Longest mount point containing the target wins
        self.disks
            .list()
            .iter()
            .filter(|disk| target.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(sysinfo::Disk::available_space)
    }
}

/// Settings for a scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Which files take part.
    pub filter: EligibilityFilter,
    /// Extension → category folder table.
    pub categories: CategoryTable,
    /// Subdivide destination trees by category.
    pub categorize: bool,
    /// Skip hidden files and directories.
    pub skip_hidden: bool,
    /// Classify and record, but copy nothing.
    pub dry_run: bool,
    /// Read size for fingerprinting and verification.
    pub chunk_size: usize,
    /// Extra free space required on top of each file's size.
    pub disk_margin: u64,
    /// Additional directories never walked (the output root always is).
    pub exclude_dirs: Vec<PathBuf>,
    /// Where the advisory progress record is kept.
    pub progress_file: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            filter: EligibilityFilter::default(),
            categories: CategoryTable::default(),
            categorize: true,
            skip_hidden: true,
            dry_run: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            disk_margin: DEFAULT_DISK_MARGIN,
            exclude_dirs: Vec::new(),
            progress_file: None,
        }
    }
}

impl ScanConfig {
    /// Restrict the scan to these extensions / MIME prefixes.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.filter = EligibilityFilter::new(extensions);
        self
    }

    /// Use a custom category table.
    #[must_use]
    pub fn with_categories(mut self, categories: CategoryTable) -> Self {
        self.categories = categories;
        self
    }

    /// Enable or disable category subfolders.
    #[must_use]
    pub fn with_categorize(mut self, categorize: bool) -> Self {
        self.categorize = categorize;
        self
    }

    /// Enable or disable skipping hidden entries.
    #[must_use]
    pub fn with_skip_hidden(mut self, skip_hidden: bool) -> Self {
        self.skip_hidden = skip_hidden;
        self
    }

    /// Enable or disable dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the read chunk size, clamped into `1..=MAX_CHUNK_SIZE`.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = bounded_chunk_size(chunk_size);
        self
    }

    /// Set the free-space safety margin.
    #[must_use]
    pub fn with_disk_margin(mut self, margin: u64) -> Self {
        self.disk_margin = margin;
        self
    }

    /// Add a directory that is never walked.
    #[must_use]
    pub fn with_exclude_dir(mut self, dir: PathBuf) -> Self {
        self.exclude_dirs.push(dir);
        self
    }

    /// Keep the progress record at `path`.
    #[must_use]
    pub fn with_progress_file(mut self, path: PathBuf) -> Self {
        self.progress_file = Some(path);
        self
    }
}

/// Errors that abort a whole run.
#[derive(thiserror::Error, Debug)]
pub enum RunError {
    /// The scan root does not exist.
    #[error("Scan root not found: {0}")]
    RootNotFound(PathBuf),

    /// The scan root is not a directory.
    #[error("Scan root is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The output tree could not be created.
    #[error("Failed to create output directory {path}: {source}")]
    CreateOutput {
        /// Directory that could not be created
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A path could not be resolved to an absolute path.
    #[error("Failed to resolve {path}: {source}")]
    Resolve {
        /// Path being resolved
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Summary of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// Scanned root (absolute)
    pub root: PathBuf,
    /// Output root (absolute)
    pub output_root: PathBuf,
    /// Whether copying was skipped
    pub dry_run: bool,
    /// Eligible files found by the walk
    pub total_candidates: u64,
    /// Candidates handled (any outcome)
    pub processed: u64,
    /// Files placed in the unique tree
    pub unique: u64,
    /// Files placed in the duplicate tree
    pub duplicates: u64,
    /// Files that failed and stay unvisited
    pub errors: u64,
    /// Files skipped because an earlier run handled them
    pub already_visited: u64,
    /// Digest matches whose content differed
    pub collisions: u64,
    /// Symbolic links skipped during the walk
    pub symlinks_skipped: u64,
    /// Directory entries the walk could not read
    pub walk_errors: u64,
    /// Bytes written into the output trees
    pub bytes_copied: u64,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
    /// Whether the run stopped early on request
    pub interrupted: bool,
}

impl ScanReport {
    fn new(root: &Path, output_root: &Path, dry_run: bool) -> Self {
        Self {
            root: root.to_path_buf(),
            output_root: output_root.to_path_buf(),
            dry_run,
            ..Self::default()
        }
    }

    /// Whether any file or directory could not be handled.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.errors > 0 || self.walk_errors > 0
    }

    /// Files not copied because they were skipped rather than failed.
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.already_visited + self.symlinks_skipped
    }
}

/// Drives a scan over one root directory.
pub struct Orchestrator<'a, F: Fingerprinter = Hasher> {
    store: &'a FingerprintStore,
    config: ScanConfig,
    fingerprinter: F,
    space_probe: Option<Box<dyn SpaceProbe + 'a>>,
    progress: Arc<dyn ProgressSink>,
    cancel: CancelToken,
}

impl<'a> Orchestrator<'a, Hasher> {
    /// Create an orchestrator using SHA-256 fingerprints.
    #[must_use]
    pub fn new(store: &'a FingerprintStore, config: ScanConfig) -> Self {
        let fingerprinter = Hasher::with_chunk_size(config.chunk_size);
        Self {
            store,
            config,
            fingerprinter,
            space_probe: None,
            progress: Arc::new(NoProgress),
            cancel: CancelToken::new(),
        }
    }
}

impl<'a, F: Fingerprinter> Orchestrator<'a, F> {
    /// Replace the fingerprint engine.
    #[must_use]
    pub fn with_fingerprinter<G: Fingerprinter>(self, fingerprinter: G) -> Orchestrator<'a, G> {
        Orchestrator {
            store: self.store,
            config: self.config,
            fingerprinter,
            space_probe: self.space_probe,
            progress: self.progress,
            cancel: self.cancel,
        }
    }

    /// Replace the free-space probe (defaults to the mounted disk list).
    #[must_use]
    pub fn with_space_probe(mut self, probe: impl SpaceProbe + 'a) -> Self {
        self.space_probe = Some(Box::new(probe));
        self
    }

    /// Report progress to `sink`.
    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    /// Stop between files once `token` is cancelled.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run the scan.
    ///
    /// Per-file failures are logged and counted in the report; they never
    /// abort the run.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] if the root is missing or not a directory, or the
    /// output tree cannot be created.
    pub fn run(&mut self, root: &Path, output_root: &Path) -> Result<ScanReport, RunError> {
        let start = Instant::now();

        if !root.exists() {
            return Err(RunError::RootNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(RunError::NotADirectory(root.to_path_buf()));
        }
        let root = resolve(root)?;

        for dir in [output_root.join(UNIQUE_DIR), output_root.join(DUPLICATE_DIR)] {
            fs::create_dir_all(&dir).map_err(|source| RunError::CreateOutput {
                path: dir.clone(),
                source,
            })?;
        }
        let output_root = resolve(output_root)?;

        let mut report = ScanReport::new(&root, &output_root, self.config.dry_run);
        log::info!(
            "Scanning {} into {}{}",
            root.display(),
            output_root.display(),
            if self.config.dry_run { " (dry run)" } else { "" }
        );

        let candidates = self.discover(&root, &output_root, &mut report);
        report.total_candidates = candidates.len() as u64;
        if self.cancel.is_cancelled() {
            log::info!("Interrupted during discovery");
            report.interrupted = true;
        }

        let mut record = self.resume_record(&root, report.total_candidates);
        self.progress.on_start(report.total_candidates);

        let probe = if self.config.dry_run {
            None
        } else {
            Some(
                self.space_probe
                    .take()
                    .unwrap_or_else(|| Box::new(SysinfoProbe::new())),
            )
        };

        let probe = {
            let mut pass = Pass {
                classifier: Classifier::new(
                    self.store,
                    &self.fingerprinter,
                    self.config.chunk_size,
                ),
                planner: PlacementPlanner::new(
                    &output_root,
                    self.config.categorize,
                    self.config.categories.clone(),
                ),
                probe,
                disk_margin: self.config.disk_margin,
                output_root: &output_root,
                report: &mut report,
            };

            for file in &candidates {
                if pass.report.interrupted {
                    break;
                }
                if self.cancel.is_cancelled() {
                    log::info!(
                        "Interrupted: stopping before {} ({} of {} processed)",
                        file.path.display(),
                        pass.report.processed,
                        pass.report.total_candidates
                    );
                    pass.report.interrupted = true;
                    break;
                }

                pass.process(file);
                pass.report.processed += 1;
                record.processed = pass.report.processed;
                self.progress.on_file(
                    pass.report.processed,
                    pass.report.total_candidates,
                    &file.path,
                );

                if pass.report.processed % SAVE_INTERVAL == 0 {
                    self.save_record(&mut record);
                }
            }

            pass.probe.take()
        };
        if probe.is_some() {
            self.space_probe = probe;
        }

        record.completed = !report.interrupted;
        self.save_record(&mut record);
        self.progress.on_finish(report.interrupted);

        report.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        log::info!(
            "Scan {}: {} unique, {} duplicates, {} errors, {} already processed",
            if report.interrupted {
                "interrupted"
            } else {
                "complete"
            },
            report.unique,
            report.duplicates,
            report.errors,
            report.already_visited
        );
        Ok(report)
    }

    fn discover(&self, root: &Path, output_root: &Path, report: &mut ScanReport) -> Vec<FileEntry> {
        let mut exclude_dirs = vec![output_root.to_path_buf()];
        exclude_dirs.extend(
            self.config
                .exclude_dirs
                .iter()
                .map(|d| fs::canonicalize(d).unwrap_or_else(|_| d.clone())),
        );

        let walker = Walker::new(root, WalkerConfig::new(self.config.skip_hidden, exclude_dirs))
            .with_shutdown_flag(self.cancel.flag());

        let mut candidates = Vec::new();
        for entry in walker.walk() {
            match entry {
                Ok(file) if self.config.filter.is_eligible(&file.path) => candidates.push(file),
                Ok(file) => log::trace!("Not eligible: {}", file.path.display()),
                Err(_) => report.walk_errors += 1,
            }
        }
        report.symlinks_skipped = walker.symlinks_skipped() as u64;

        log::debug!("Discovered {} eligible files", candidates.len());
        candidates
    }

    fn resume_record(&self, root: &Path, total: u64) -> ProgressRecord {
        if let Some(path) = &self.config.progress_file {
            if let Some(previous) = ProgressRecord::load_lenient(path) {
                if previous.root == root && !previous.completed {
                    log::info!(
                        "Resuming interrupted run: {} of {} files were processed previously",
                        previous.processed,
                        previous.total_candidates
                    );
                }
            }
        }
        ProgressRecord::new(root, total)
    }

    fn save_record(&self, record: &mut ProgressRecord) {
        if let Some(path) = &self.config.progress_file {
            if let Err(e) = record.save(path) {
                log::warn!("Failed to save progress record: {e:#}");
            }
        }
    }
}

fn resolve(path: &Path) -> Result<PathBuf, RunError> {
    fs::canonicalize(path).map_err(|source| RunError::Resolve {
        path: path.to_path_buf(),
        source,
    })
}

/// State for one pass over the candidate list.
struct Pass<'p, 's, F: Fingerprinter> {
    classifier: Classifier<'s, &'p F>,
    planner: PlacementPlanner,
    probe: Option<Box<dyn SpaceProbe + 's>>,
    disk_margin: u64,
    output_root: &'p Path,
    report: &'p mut ScanReport,
}

impl<F: Fingerprinter> Pass<'_, '_, F> {
    fn process(&mut self, file: &FileEntry) {
        let classification = self.classifier.classify(&file.path);

        match &classification {
            Classification::AlreadyVisited(path) => {
                log::info!("Skipping already processed file: {}", path.display());
                self.report.already_visited += 1;
                return;
            }
            Classification::Error { source, reason } => {
                log::error!("Skipping {}: {}", source.display(), reason);
                self.report.errors += 1;
                return;
            }
            Classification::Unique {
                collision: Some(_), ..
            } => self.report.collisions += 1,
            _ => {}
        }

        match self.place(file, &classification) {
            Ok(dest) => {
                match &classification {
                    Classification::Duplicate { original, .. } => {
                        self.report.duplicates += 1;
                        log::info!(
                            "Duplicate: {} (matches {}) -> {}",
                            file.path.display(),
                            original.display(),
                            dest.display()
                        );
                    }
                    _ => {
                        self.report.unique += 1;
                        log::info!("Unique: {} -> {}", file.path.display(), dest.display());
                    }
                }
            }
            Err(e) => {
                log::error!("Skipping {}: {}", file.path.display(), e);
                self.report.errors += 1;
            }
        }
    }

    fn place(
        &mut self,
        file: &FileEntry,
        classification: &Classification,
    ) -> Result<PathBuf, FileError> {
        if let Some(dest) = self.classifier.existing_copy(classification) {
            log::info!(
                "{} already exists in destination as {}",
                file.path.display(),
                dest.display()
            );
            self.classifier.finish(classification)?;
            return Ok(dest);
        }

        let category = self.planner.category_for(&file.path).to_string();
        let dest = self
            .planner
            .plan(classification, &category)?
            .ok_or_else(|| FileError::Copy {
                from: file.path.clone(),
                to: self.output_root.to_path_buf(),
                source: io::Error::other("classification has no destination"),
            })?;

        match self.probe.as_mut() {
            None => {
                log::info!(
                    "Dry-run: would copy {} to {}",
                    file.path.display(),
                    dest.display()
                );
            }
            Some(probe) => {
                let required = file.size.saturating_add(self.disk_margin);
                match probe.available_space(self.output_root) {
                    Some(available) if available < required => {
                        return Err(FileError::DiskSpace {
                            path: file.path.clone(),
                            required,
                            available,
                        });
                    }
                    Some(_) => {}
                    None => log::debug!(
                        "Free space unknown for {}, copying anyway",
                        self.output_root.display()
                    ),
                }
                self.classifier.begin_copy(classification, &dest)?;
                self.report.bytes_copied += copy_file(&file.path, &dest)?;
            }
        }

        self.classifier.finish(classification)?;
        Ok(dest)
    }
}

/// Copy `src` to `dest` without ever exposing a partial file at `dest`.
///
/// Bytes go to a hidden temp file in the destination directory, which is
/// synced, given the source's modification time and then renamed into
/// place. The rename refuses to overwrite an existing file.
fn copy_file(src: &Path, dest: &Path) -> Result<u64, FileError> {
    let copy_err = |source: io::Error| FileError::Copy {
        from: src.to_path_buf(),
        to: dest.to_path_buf(),
        source,
    };

    let dir = dest
        .parent()
        .ok_or_else(|| copy_err(io::Error::other("destination has no parent directory")))?;
    fs::create_dir_all(dir).map_err(copy_err)?;

    let mut input = File::open(src).map_err(copy_err)?;
    let mut tmp = tempfile::Builder::new()
        .prefix(".uniqsort-")
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(copy_err)?;

    let bytes = io::copy(&mut input, tmp.as_file_mut()).map_err(copy_err)?;
    tmp.as_file().sync_all().map_err(copy_err)?;

    if let Ok(metadata) = input.metadata() {
        let mtime = FileTime::from_last_modification_time(&metadata);
        if let Err(e) = filetime::set_file_handle_times(tmp.as_file(), None, Some(mtime)) {
            log::debug!("Could not preserve mtime for {}: {}", dest.display(), e);
        }
    }

    tmp.persist_noclobber(dest).map_err(|e| copy_err(e.error))?;
    Ok(bytes)
}
