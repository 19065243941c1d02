//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! [`Walker`] traverses a directory tree on the calling thread in a
//! deterministic (file name sorted) order and yields regular files.
//!
//! - Symbolic links are never followed. Each one is logged as a warning and
//!   skipped, which rules out cycles and escapes outside the root.
//! - Directories listed in [`WalkerConfig::exclude_dirs`] are pruned.
//! - Hidden entries (leading `.`) are pruned when configured.
//! - Iteration stops early once the shutdown flag is raised.

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::{DirEntry, WalkDir};

use super::{FileEntry, ScanError, WalkerConfig};

/// Sequential directory walker.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
    /// Symlinks skipped by the last walk
    symlinks_skipped: Cell<usize>,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
            symlinks_skipped: Cell::new(0),
        }
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Number of symbolic links skipped so far.
    #[must_use]
    pub fn symlinks_skipped(&self) -> usize {
        self.symlinks_skipped.get()
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn is_hidden(entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with('.'))
    }

    fn is_excluded_dir(&self, entry: &DirEntry) -> bool {
        if !entry.file_type().is_dir() || self.config.exclude_dirs.is_empty() {
            return false;
        }
        let path = entry.path();
        if self.config.exclude_dirs.iter().any(|ex| ex == path) {
            return true;
        }
        std::fs::canonicalize(path)
            .is_ok_and(|canonical| self.config.exclude_dirs.iter().any(|ex| *ex == canonical))
    }

    /// Walk the directory tree, yielding regular files.
    ///
    /// Errors are yielded as [`ScanError`] values rather than stopping
    /// iteration.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileEntry, ScanError>> + '_ {
        self.symlinks_skipped.set(0);

        let walk_dir = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name();

        walk_dir
            .into_iter()
            .filter_entry(move |entry| {
                if self.config.skip_hidden && Self::is_hidden(entry) {
                    log::trace!("Skipping hidden entry: {}", entry.path().display());
                    return false;
                }
                if self.is_excluded_dir(entry) {
                    log::debug!("Skipping excluded directory: {}", entry.path().display());
                    return false;
                }
                true
            })
            .take_while(move |_| {
                if self.is_shutdown_requested() {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                    false
                } else {
                    true
                }
            })
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => self.process_entry(&entry),
                Err(e) => Some(Err(self.handle_walk_error(e))),
            })
    }

    fn process_entry(&self, entry: &DirEntry) -> Option<Result<FileEntry, ScanError>> {
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            log::warn!("Skipping symbolic link: {}", entry.path().display());
            self.symlinks_skipped.set(self.symlinks_skipped.get() + 1);
            return None;
        }

        if !file_type.is_file() {
            return None;
        }

        match entry.metadata() {
            Ok(metadata) => Some(Ok(FileEntry::new(
                entry.path().to_path_buf(),
                metadata.len(),
            ))),
            Err(e) => Some(Err(self.handle_walk_error(e))),
        }
    }

    fn handle_walk_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        match error.io_error().map(std::io::Error::kind) {
            Some(std::io::ErrorKind::PermissionDenied) => {
                log::error!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path)
            }
            Some(std::io::ErrorKind::NotFound) => {
                log::error!("Path not found: {}", path.display());
                ScanError::NotFound(path)
            }
            _ => {
                log::error!("Walker error for {}: {}", path.display(), error);
                let source = error
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                ScanError::Io { path, source }
            }
        }
    }
}
