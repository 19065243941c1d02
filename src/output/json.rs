//! JSON output for scan reports and store status.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "root": "/photos",
//!   "output_root": "/sorted",
//!   "dry_run": false,
//!   "total_candidates": 3,
//!   "processed": 3,
//!   "unique": 2,
//!   "duplicates": 1,
//!   "errors": 0,
//!   "already_visited": 0,
//!   "collisions": 0,
//!   "symlinks_skipped": 0,
//!   "walk_errors": 0,
//!   "bytes_copied": 1536,
//!   "duration_ms": 12,
//!   "interrupted": false,
//!   "exit_code": 0,
//!   "exit_code_name": "US000"
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use super::StoreStatus;
use crate::dedupe::ScanReport;
use crate::error::ExitCode;

/// A scan report with its exit code.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    /// Counters from the run
    #[serde(flatten)]
    pub report: &'a ScanReport,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "US000")
    pub exit_code_name: String,
}

impl<'a> JsonOutput<'a> {
    /// Wrap a report for serialization.
    #[must_use]
    pub fn new(report: &'a ScanReport, exit_code: ExitCode) -> Self {
        Self {
            report,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty-printed JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        serde_json::to_writer_pretty(&mut *writer, self)?;
        writeln!(writer)
    }
}

/// Write a store status as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_status<W: Write>(status: &StoreStatus, writer: &mut W) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, status)?;
    writeln!(writer)
}
