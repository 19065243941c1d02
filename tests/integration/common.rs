//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use uniqsort::dedupe::{Orchestrator, ScanConfig, ScanReport};
use uniqsort::store::FingerprintStore;
use walkdir::WalkDir;

/// A probe reporting endless free space.
pub fn unlimited(_: &Path) -> Option<u64> {
    Some(u64::MAX)
}

/// JPEG-only scan with no disk margin.
pub fn jpg_config() -> ScanConfig {
    ScanConfig::default()
        .with_extensions([".jpg"])
        .with_disk_margin(0)
}

/// Write `content` to `root/rel`, creating parent directories.
pub fn write(root: &Path, rel: &str, content: &[u8]) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    fs::canonicalize(&path).unwrap()
}

/// Run a scan with an unlimited space probe.
pub fn run(
    store: &FingerprintStore,
    root: &Path,
    output: &Path,
    config: ScanConfig,
) -> ScanReport {
    Orchestrator::new(store, config)
        .with_space_probe(unlimited)
        .run(root, output)
        .unwrap()
}

/// Regular files under `dir`, relative and sorted.
pub fn files_under(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().strip_prefix(dir).unwrap().to_path_buf())
        .collect();
    files.sort();
    files
}

/// Relative file list together with contents.
pub fn tree_contents(dir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    files_under(dir)
        .into_iter()
        .map(|rel| {
            let content = fs::read(dir.join(&rel)).unwrap();
            (rel, content)
        })
        .collect()
}

/// Store records as `(hex digest, file name)`, sorted.
///
/// File names instead of full paths so stores built over different
/// temporary roots can be compared.
pub fn record_names(store: &FingerprintStore) -> Vec<(String, String)> {
    let mut records: Vec<(String, String)> = store
        .records()
        .unwrap()
        .into_iter()
        .map(|(digest, path)| {
            (
                uniqsort::scanner::hash_to_hex(&digest),
                path.file_name().unwrap().to_string_lossy().into_owned(),
            )
        })
        .collect();
    records.sort();
    records
}
