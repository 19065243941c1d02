//! Structured error handling and exit codes.

use std::path::PathBuf;

use serde::Serialize;

use crate::dedupe::placement::PlacementError;
use crate::scanner::HashError;
use crate::store::StoreError;

/// Exit codes for the uniqsort application.
///
/// - 0: Success (completed normally, or stopped cleanly on Ctrl+C)
/// - 1: General error (fatal failure before or during the run)
/// - 3: Partial success (completed, but some files could not be handled)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the run completed or was stopped cleanly.
    Success = 0,
    /// General error: an unexpected, fatal failure.
    GeneralError = 1,
    /// Partial success: some files failed and will be retried next run.
    PartialSuccess = 3,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "US000",
            Self::GeneralError => "US001",
            Self::PartialSuccess => "US003",
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "US001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
        }
    }
}

/// Why a single file could not be handled.
///
/// None of these abort a run; the file is logged, left out of the visited
/// set and retried on the next run.
#[derive(thiserror::Error, Debug)]
pub enum FileError {
    /// The source file (or the recorded original) could not be read.
    #[error(transparent)]
    Io(#[from] HashError),

    /// The store refused a digest insert because it already exists.
    #[error("Internal store invariant violated: {0}")]
    DuplicateKey(String),

    /// Any other store failure.
    #[error(transparent)]
    Store(StoreError),

    /// Not enough free space on the destination disk.
    #[error(
        "Insufficient disk space to copy {path}: need {required} bytes, {available} available"
    )]
    DiskSpace {
        /// Source file
        path: PathBuf,
        /// Bytes needed including the safety margin
        required: u64,
        /// Bytes free on the destination
        available: u64,
    },

    /// No destination file name could be found.
    #[error(transparent)]
    Placement(#[from] PlacementError),

    /// Copying into the destination failed.
    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        /// Source file
        from: PathBuf,
        /// Intended destination
        to: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl From<StoreError> for FileError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey(digest) => Self::DuplicateKey(digest),
            other => Self::Store(other),
        }
    }
}
