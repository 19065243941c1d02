//! Unique / duplicate classification.
//!
//! # Algorithm
//!
//! 1. A path already in the visited set is reported as
//!    [`Classification::AlreadyVisited`] and left alone.
//! 2. The file is fingerprinted. Read failures become
//!    [`Classification::Error`] and the file stays unvisited.
//! 3. A digest seen for the first time is recorded and the file is unique.
//! 4. A digest recorded for this very path is unique again (a rerun after
//!    an interrupted copy lands here).
//! 5. A digest recorded for another path is verified byte for byte. Equal
//!    content is a duplicate of the recorded path; different content is a
//!    hash collision, logged and filed as unique without touching the
//!    existing record.
//!
//! Classification does not mark the file visited. The orchestrator calls
//! [`Classifier::begin_copy`] before copying and [`Classifier::finish`] once
//! the copy has succeeded, so a failed copy is retried on the next run and a
//! copy that landed just before the process died is found again through
//! [`Classifier::existing_copy`] instead of being made twice.

use std::path::{Path, PathBuf};

use crate::error::FileError;
use crate::scanner::{hash_to_hex, identical, Fingerprinter, Hash, HashError};
use crate::store::{FingerprintStore, StoreResult};

/// Outcome of classifying one file.
#[derive(Debug)]
pub enum Classification {
    /// Handled by an earlier run; nothing to do.
    AlreadyVisited(PathBuf),

    /// First file seen with this content.
    Unique {
        /// Content fingerprint
        digest: Hash,
        /// File being classified
        source: PathBuf,
        /// Recorded path whose digest matched but content did not
        collision: Option<PathBuf>,
    },

    /// Same content as a previously recorded file.
    Duplicate {
        /// Content fingerprint
        digest: Hash,
        /// File being classified
        source: PathBuf,
        /// First-seen file with this content
        original: PathBuf,
    },

    /// The file could not be classified.
    Error {
        /// File being classified
        source: PathBuf,
        /// What went wrong
        reason: FileError,
    },
}

impl Classification {
    /// The file this classification is about.
    #[must_use]
    pub fn source(&self) -> &Path {
        match self {
            Self::AlreadyVisited(source)
            | Self::Unique { source, .. }
            | Self::Duplicate { source, .. }
            | Self::Error { source, .. } => source,
        }
    }

    /// Whether the file needs to be placed into a destination tree.
    #[must_use]
    pub fn needs_placement(&self) -> bool {
        matches!(self, Self::Unique { .. } | Self::Duplicate { .. })
    }

    fn error(source: &Path, reason: impl Into<FileError>) -> Self {
        Self::Error {
            source: source.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Classifies files against a [`FingerprintStore`].
pub struct Classifier<'s, F: Fingerprinter> {
    store: &'s FingerprintStore,
    fingerprinter: F,
    chunk_size: usize,
}

impl<'s, F: Fingerprinter> Classifier<'s, F> {
    /// Create a classifier.
    ///
    /// `chunk_size` is used when verifying a digest match byte for byte.
    pub fn new(store: &'s FingerprintStore, fingerprinter: F, chunk_size: usize) -> Self {
        Self {
            store,
            fingerprinter,
            chunk_size,
        }
    }

    /// Classify the file at `path`.
    pub fn classify(&self, path: &Path) -> Classification {
        match self.store.is_visited(path) {
            Ok(true) => return Classification::AlreadyVisited(path.to_path_buf()),
            Ok(false) => {}
            Err(e) => return Classification::error(path, e),
        }

        let digest = match self.fingerprinter.fingerprint(path) {
            Ok(digest) => digest,
            Err(e) => return Classification::error(path, e),
        };

        let existing = match self.store.lookup(&digest) {
            Ok(existing) => existing,
            Err(e) => return Classification::error(path, e),
        };

        let Some(existing) = existing else {
            if let Err(e) = self.store.record(&digest, path) {
                return Classification::error(path, e);
            }
            return Classification::Unique {
                digest,
                source: path.to_path_buf(),
                collision: None,
            };
        };

        if existing == path {
            return Classification::Unique {
                digest,
                source: path.to_path_buf(),
                collision: None,
            };
        }

        match identical(path, &existing, self.chunk_size) {
            Ok(true) => Classification::Duplicate {
                digest,
                source: path.to_path_buf(),
                original: existing,
            },
            Ok(false) => {
                log::warn!(
                    "Hash collision: {} and {} share digest {} but differ in content",
                    path.display(),
                    existing.display(),
                    hash_to_hex(&digest)
                );
                Classification::Unique {
                    digest,
                    source: path.to_path_buf(),
                    collision: Some(existing),
                }
            }
            Err(e) if Self::failed_on(&e, path) => Classification::error(path, e),
            Err(e) => {
                // The recorded original is gone or unreadable. Never call
                // something a duplicate without checking its bytes.
                log::warn!(
                    "Cannot verify {} against recorded original {}: {}; filing as unique",
                    path.display(),
                    existing.display(),
                    e
                );
                Classification::Unique {
                    digest,
                    source: path.to_path_buf(),
                    collision: Some(existing),
                }
            }
        }
    }

    /// Destination that already holds this file's bytes from a copy whose
    /// run stopped before the file was marked visited.
    ///
    /// Returns `None` when no copy was started, the destination is gone or
    /// its content differs from the source.
    pub fn existing_copy(&self, classification: &Classification) -> Option<PathBuf> {
        if !classification.needs_placement() {
            return None;
        }
        let source = classification.source();
        let dest = match self.store.pending_copy(source) {
            Ok(dest) => dest?,
            Err(e) => {
                log::debug!("Pending copy lookup failed for {}: {}", source.display(), e);
                return None;
            }
        };

        match identical(source, &dest, self.chunk_size) {
            Ok(true) => Some(dest),
            Ok(false) => None,
            Err(e) => {
                log::debug!("Cannot reuse {} for {}: {}", dest.display(), source.display(), e);
                None
            }
        }
    }

    /// Record that the source is about to be copied to `dest`.
    ///
    /// # Errors
    ///
    /// Returns the store error if the insert fails.
    pub fn begin_copy(&self, classification: &Classification, dest: &Path) -> StoreResult<()> {
        self.store.begin_copy(classification.source(), dest)
    }

    /// Mark a placed file as visited.
    ///
    /// Does nothing for classifications that were not placed.
    ///
    /// # Errors
    ///
    /// Returns the store error if the visited insert fails.
    pub fn finish(&self, classification: &Classification) -> StoreResult<()> {
        if classification.needs_placement() {
            self.store.mark_visited(classification.source())?;
        }
        Ok(())
    }

    fn failed_on(error: &HashError, source: &Path) -> bool {
        let failed = match error {
            HashError::NotFound(p) | HashError::PermissionDenied(p) => p,
            HashError::Io { path, .. } => path,
        };
        failed == source
    }
}
