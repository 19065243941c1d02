//! Advisory scan progress record.
//!
//! The record lives in a JSON file wrapped in an envelope with a SHA-256
//! checksum, and is replaced atomically (temp file + rename) on every save.
//! It only feeds progress display: a missing, stale or corrupt record is
//! logged and ignored.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Current version of the progress file format.
pub const PROGRESS_VERSION: u32 = 1;

/// Processed / total counters for a scan root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Format version.
    pub version: u32,
    /// Root directory being scanned.
    pub root: PathBuf,
    /// Eligible files discovered by the walk.
    pub total_candidates: u64,
    /// Files handled so far, including ones skipped as already visited.
    pub processed: u64,
    /// Whether the run reached the end of the walk.
    pub completed: bool,
    /// Last time the record was written.
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProgressEnvelope {
    checksum: String,
    progress: ProgressRecord,
}

fn checksum(record: &ProgressRecord) -> Result<String> {
    let json = serde_json::to_string(record).context("Failed to serialize progress record")?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

impl ProgressRecord {
    /// Start a fresh record for `root`.
    #[must_use]
    pub fn new(root: &Path, total_candidates: u64) -> Self {
        Self {
            version: PROGRESS_VERSION,
            root: root.to_path_buf(),
            total_candidates,
            processed: 0,
            completed: false,
            updated_at: Utc::now(),
        }
    }

    /// Fraction of candidates processed, in `0.0..=1.0`.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.total_candidates == 0 {
            if self.completed {
                1.0
            } else {
                0.0
            }
        } else {
            (self.processed as f64 / self.total_candidates as f64).min(1.0)
        }
    }

    /// Write the record atomically to `path`.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created or the file cannot be
    /// written and renamed into place.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.updated_at = Utc::now();
        let envelope = ProgressEnvelope {
            checksum: checksum(self)?,
            progress: self.clone(),
        };
        let json = serde_json::to_string_pretty(&envelope)
            .context("Failed to serialize progress envelope")?;

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        tmp.write_all(json.as_bytes())
            .context("Failed to write progress record")?;
        tmp.as_file()
            .sync_all()
            .context("Failed to sync progress record")?;
        tmp.persist(path)
            .with_context(|| format!("Failed to replace progress file: {}", path.display()))?;
        Ok(())
    }

    /// Load a record, returning `Ok(None)` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Fails on unreadable, malformed, tampered or wrong-version files.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read progress file: {}", path.display()))?;
        let envelope: ProgressEnvelope =
            serde_json::from_str(&content).context("Failed to parse progress file")?;

        if checksum(&envelope.progress)? != envelope.checksum {
            anyhow::bail!("Progress file checksum mismatch: {}", path.display());
        }
        if envelope.progress.version != PROGRESS_VERSION {
            anyhow::bail!(
                "Unsupported progress version: {}. Current version is {}.",
                envelope.progress.version,
                PROGRESS_VERSION
            );
        }
        Ok(Some(envelope.progress))
    }

    /// Load a record, logging and discarding anything unusable.
    #[must_use]
    pub fn load_lenient(path: &Path) -> Option<Self> {
        match Self::load(path) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Ignoring progress record: {e:#}");
                None
            }
        }
    }

    /// Delete the record file if present.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be removed.
    pub fn remove(path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove progress file: {}", path.display())),
        }
    }
}
