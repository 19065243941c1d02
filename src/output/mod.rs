//! Output formatters for scan reports.
//!
//! - [`text`] for people (colored with yansi)
//! - [`json`] for scripting
//!
//! # Example
//!
//! ```no_run
//! use uniqsort::dedupe::{Orchestrator, ScanConfig};
//! use uniqsort::error::ExitCode;
//! use uniqsort::output::json::JsonOutput;
//! use uniqsort::store::FingerprintStore;
//! use std::path::Path;
//!
//! let store = FingerprintStore::open_in_memory().unwrap();
//! let report = Orchestrator::new(&store, ScanConfig::default())
//!     .run(Path::new("/photos"), Path::new("/sorted"))
//!     .unwrap();
//! println!("{}", JsonOutput::new(&report, ExitCode::Success).to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod text;

use std::path::PathBuf;

use serde::Serialize;

use crate::store::ProgressRecord;

pub use json::JsonOutput;

/// Snapshot of the durable state, shown by `uniqsort status`.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    /// Directory holding the store
    pub state_dir: PathBuf,
    /// Recorded fingerprints
    pub records: u64,
    /// Visited source paths
    pub visited: u64,
    /// Advisory progress of the last run, if readable
    pub progress: Option<ProgressRecord>,
}
