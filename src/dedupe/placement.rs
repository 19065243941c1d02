//! Destination planning for classified files.
//!
//! Layout:
//!
//! ```text
//! <output_root>/UniqueFiles/[<category>/]<filename>
//! <output_root>/DuplicateFiles/[<category>/]<filename>
//! ```
//!
//! When the natural file name is taken, a numeric suffix is inserted before
//! the extension (`name_1.ext`, `name_2.ext`, ...). Resolution reads the
//! destination tree as it is right now, so it must run under the
//! orchestrator's single writer.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::Classification;
use crate::scanner::CategoryTable;

/// Folder for files seen for the first time.
pub const UNIQUE_DIR: &str = "UniqueFiles";

/// Folder for files whose content was already seen.
pub const DUPLICATE_DIR: &str = "DuplicateFiles";

/// Largest numeric suffix tried before giving up on a name.
pub const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Errors raised while planning a destination.
#[derive(thiserror::Error, Debug)]
pub enum PlacementError {
    /// Every suffix up to the cap is already taken.
    #[error("No free file name for {base} in {dir} after {attempts} attempts")]
    NameSpaceExhausted {
        /// Destination directory
        dir: PathBuf,
        /// Requested file name
        base: String,
        /// Suffixes tried
        attempts: u32,
    },

    /// The source path has no file name component.
    #[error("Source path has no file name: {0}")]
    MissingFileName(PathBuf),
}

/// Find a free path for `base` inside `dir`.
///
/// Returns `dir/base` if free, otherwise the first free `stem_N.ext` with
/// `N` counting up from 1. Dotfiles such as `.profile` have no extension and
/// get the suffix appended (`.profile_1`).
///
/// # Errors
///
/// Returns [`PlacementError::NameSpaceExhausted`] if no free name exists
/// within [`MAX_NAME_ATTEMPTS`] suffixes.
pub fn next_free_name(dir: &Path, base: &Path) -> Result<PathBuf, PlacementError> {
    next_free_name_capped(dir, base, MAX_NAME_ATTEMPTS)
}

fn next_free_name_capped(dir: &Path, base: &Path, cap: u32) -> Result<PathBuf, PlacementError> {
    let candidate = dir.join(base);
    if !exists(&candidate) {
        return Ok(candidate);
    }

    let stem = base
        .file_stem()
        .map_or_else(OsString::new, |s| s.to_os_string());
    let extension = base.extension();

    for i in 1..=cap {
        let mut name = stem.clone();
        name.push(format!("_{i}"));
        if let Some(ext) = extension {
            name.push(".");
            name.push(ext);
        }
        let candidate = dir.join(&name);
        if !exists(&candidate) {
            return Ok(candidate);
        }
    }

    Err(PlacementError::NameSpaceExhausted {
        dir: dir.to_path_buf(),
        base: base.to_string_lossy().into_owned(),
        attempts: cap,
    })
}

/// A dangling symlink still occupies the name.
fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Decides where classified files go.
#[derive(Debug, Clone)]
pub struct PlacementPlanner {
    unique_root: PathBuf,
    duplicate_root: PathBuf,
    categorize: bool,
    categories: CategoryTable,
}

impl PlacementPlanner {
    /// Create a planner rooted at `output_root`.
    #[must_use]
    pub fn new(output_root: &Path, categorize: bool, categories: CategoryTable) -> Self {
        Self {
            unique_root: output_root.join(UNIQUE_DIR),
            duplicate_root: output_root.join(DUPLICATE_DIR),
            categorize,
            categories,
        }
    }

    /// Category folder for `path` according to the injected table.
    #[must_use]
    pub fn category_for(&self, path: &Path) -> &str {
        self.categories.category_for(path)
    }

    /// Directory a file of `category` lands in.
    #[must_use]
    pub fn destination_dir(&self, duplicate: bool, category: &str) -> PathBuf {
        let root = if duplicate {
            &self.duplicate_root
        } else {
            &self.unique_root
        };
        if self.categorize {
            root.join(category)
        } else {
            root.clone()
        }
    }

    /// Plan the destination for a classification.
    ///
    /// Returns `Ok(None)` for classifications that are not copied anywhere
    /// (already visited, or failed).
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError`] if the source has no file name or no free
    /// name can be found.
    pub fn plan(
        &self,
        classification: &Classification,
        category: &str,
    ) -> Result<Option<PathBuf>, PlacementError> {
        let duplicate = match classification {
            Classification::Unique { .. } => false,
            Classification::Duplicate { .. } => true,
            Classification::AlreadyVisited(_) | Classification::Error { .. } => return Ok(None),
        };

        let source = classification.source();
        let file_name = source
            .file_name()
            .ok_or_else(|| PlacementError::MissingFileName(source.to_path_buf()))?;

        let dir = self.destination_dir(duplicate, category);
        next_free_name(&dir, Path::new(file_name)).map(Some)
    }
}
