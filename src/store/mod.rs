//! Durable run state for uniqsort.
//!
//! # Architecture
//!
//! * [`database`]: SQLite-backed [`FingerprintStore`] owning the two durable
//!   tables: digest → first-seen path, and the visited set.
//! * [`progress`]: the advisory [`ProgressRecord`] (processed / total) kept
//!   in a small JSON file next to the database.
//!
//! The visited set is authoritative for "has this file been handled"; the
//! progress record is only used for display and may be lost or stale
//! without affecting correctness.

pub mod database;
pub mod progress;

use std::path::{Path, PathBuf};

pub use database::{FingerprintStore, StoreError, StoreResult};
pub use progress::ProgressRecord;

/// Name of the state directory created under the output root by default.
pub const DEFAULT_STATE_DIR: &str = ".uniqsort";

/// File locations inside a state directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    /// SQLite database holding fingerprints and the visited set.
    pub database: PathBuf,
    /// Advisory progress record.
    pub progress: PathBuf,
}

impl StatePaths {
    /// Lay out state files inside `state_dir`.
    #[must_use]
    pub fn in_dir(state_dir: &Path) -> Self {
        Self {
            database: state_dir.join("fingerprints.db"),
            progress: state_dir.join("progress.json"),
        }
    }

    /// Resolve the state directory: an explicit one, or the default under
    /// `output_root`.
    #[must_use]
    pub fn resolve(state_dir: Option<&Path>, output_root: &Path) -> Self {
        match state_dir {
            Some(dir) => Self::in_dir(dir),
            None => Self::in_dir(&output_root.join(DEFAULT_STATE_DIR)),
        }
    }
}
