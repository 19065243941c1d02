use std::fs;
use std::path::PathBuf;

use tempfile::tempdir;
use uniqsort::scanner::{Fingerprinter, Hasher};
use uniqsort::store::{FingerprintStore, StoreError};

#[test]
fn test_records_persist_across_reopen() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("state").join("fingerprints.db");
    let file = dir.path().join("a.jpg");
    fs::write(&file, b"content").unwrap();
    let digest = Hasher::new().fingerprint(&file).unwrap();

    {
        let store = FingerprintStore::open(&db).unwrap();
        store.record(&digest, &file).unwrap();
        store.mark_visited(&file).unwrap();
        store.close().unwrap();
    }

    let store = FingerprintStore::open(&db).unwrap();
    assert_eq!(store.lookup(&digest).unwrap(), Some(file.clone()));
    assert!(store.is_visited(&file).unwrap());
    assert!(!store.is_visited(&dir.path().join("b.jpg")).unwrap());
}

#[test]
fn test_second_record_for_digest_is_rejected() {
    let store = FingerprintStore::open_in_memory().unwrap();
    let digest = [3u8; 32];
    store.record(&digest, &PathBuf::from("/a.jpg")).unwrap();

    let err = store.record(&digest, &PathBuf::from("/b.jpg")).unwrap_err();
    assert!(matches!(err, StoreError::DuplicateKey(_)));
    assert_eq!(
        store.lookup(&digest).unwrap(),
        Some(PathBuf::from("/a.jpg"))
    );
}

#[test]
fn test_clear_empties_both_tables() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("fingerprints.db");
    let mut store = FingerprintStore::open(&db).unwrap();
    store.record(&[1; 32], &PathBuf::from("/a.jpg")).unwrap();
    store.record(&[2; 32], &PathBuf::from("/b.jpg")).unwrap();
    store.mark_visited(&PathBuf::from("/a.jpg")).unwrap();

    store.clear().unwrap();

    assert_eq!(store.record_count().unwrap(), 0);
    assert_eq!(store.visited_count().unwrap(), 0);
    store.close().unwrap();

    let store = FingerprintStore::open(&db).unwrap();
    assert_eq!(store.record_count().unwrap(), 0);
}

#[test]
fn test_mark_visited_is_idempotent() {
    let store = FingerprintStore::open_in_memory().unwrap();
    let path = PathBuf::from("/photos/a.jpg");
    store.mark_visited(&path).unwrap();
    store.mark_visited(&path).unwrap();
    assert_eq!(store.visited_count().unwrap(), 1);
}

#[test]
fn test_visited_keys_distinguish_normalization_forms() {
    let store = FingerprintStore::open_in_memory().unwrap();
    // "é" precomposed vs. "e" + combining acute accent: two different names
    store.mark_visited(&PathBuf::from("/photos/caf\u{e9}.jpg")).unwrap();
    assert!(!store
        .is_visited(&PathBuf::from("/photos/cafe\u{301}.jpg"))
        .unwrap());
    assert!(store
        .is_visited(&PathBuf::from("/photos/caf\u{e9}.jpg"))
        .unwrap());
}

#[test]
fn test_record_paths_roundtrip_exactly() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("fingerprints.db");
    let nfd = PathBuf::from("/photos/cafe\u{301}.jpg");

    {
        let store = FingerprintStore::open(&db).unwrap();
        store.record(&[9; 32], &nfd).unwrap();
        store.mark_visited(&nfd).unwrap();
    }

    let store = FingerprintStore::open(&db).unwrap();
    assert_eq!(store.lookup(&[9; 32]).unwrap(), Some(nfd.clone()));
    assert_eq!(store.visited_paths().unwrap(), vec![nfd]);
}
