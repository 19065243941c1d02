use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;
use uniqsort::dedupe::{Orchestrator, DUPLICATE_DIR, SAVE_INTERVAL, UNIQUE_DIR};
use uniqsort::progress::ProgressSink;
use uniqsort::scanner::{Fingerprinter, Hasher};
use uniqsort::signal::CancelToken;
use uniqsort::store::{FingerprintStore, ProgressRecord, StatePaths};

use super::common::{files_under, jpg_config, record_names, run, tree_contents, unlimited, write};

/// Requests a stop once `after` files have been handled.
struct CancelAfter {
    token: CancelToken,
    after: u64,
}

impl ProgressSink for CancelAfter {
    fn on_start(&self, _total: u64) {}

    fn on_file(&self, processed: u64, _total: u64, _path: &Path) {
        if processed >= self.after {
            self.token.cancel();
        }
    }

    fn on_finish(&self, _interrupted: bool) {}
}

fn populate(root: &Path) {
    let contents: [&[u8]; 6] = [b"A", b"B", b"A", b"C", b"B", b"A"];
    for (i, content) in contents.iter().enumerate() {
        write(root, &format!("f{i}.jpg"), content);
    }
}

#[test]
fn test_interrupt_then_resume_matches_uninterrupted_run() {
    let src = tempdir().unwrap();
    populate(src.path());

    // Reference run straight through
    let ref_out = tempdir().unwrap();
    let ref_store = FingerprintStore::open_in_memory().unwrap();
    let reference = run(&ref_store, src.path(), ref_out.path(), jpg_config());
    assert_eq!(reference.unique, 3);
    assert_eq!(reference.duplicates, 3);

    // Interrupted after two files, then resumed
    let out = tempdir().unwrap();
    let store = FingerprintStore::open_in_memory().unwrap();
    let token = CancelToken::new();
    let sink = Arc::new(CancelAfter {
        token: token.clone(),
        after: 2,
    });

    let first = Orchestrator::new(&store, jpg_config())
        .with_space_probe(unlimited)
        .with_progress(sink)
        .with_cancel_token(token)
        .run(src.path(), out.path())
        .unwrap();

    assert!(first.interrupted);
    assert_eq!(first.processed, 2);
    assert_eq!(first.total_candidates, 6);
    assert_eq!(store.visited_count().unwrap(), 2);

    let second = run(&store, src.path(), out.path(), jpg_config());
    assert!(!second.interrupted);
    assert_eq!(second.already_visited, 2);
    assert_eq!(first.unique + second.unique, reference.unique);
    assert_eq!(first.duplicates + second.duplicates, reference.duplicates);

    assert_eq!(tree_contents(out.path()), tree_contents(ref_out.path()));
    assert_eq!(record_names(&store), record_names(&ref_store));
}

#[test]
fn test_cancelled_before_start_processes_nothing() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    populate(src.path());
    let store = FingerprintStore::open_in_memory().unwrap();
    let token = CancelToken::new();
    token.cancel();

    let report = Orchestrator::new(&store, jpg_config())
        .with_space_probe(unlimited)
        .with_cancel_token(token)
        .run(src.path(), out.path())
        .unwrap();

    assert!(report.interrupted);
    assert_eq!(report.processed, 0);
    assert!(files_under(out.path()).is_empty());
    assert_eq!(store.visited_count().unwrap(), 0);
}

#[test]
fn test_store_survives_reopen_without_close() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    populate(src.path());
    let paths = StatePaths::resolve(None, out.path());

    {
        let store = FingerprintStore::open(&paths.database).unwrap();
        run(&store, src.path(), out.path(), jpg_config());
        // Dropped without close, as after a crash
    }

    let store = FingerprintStore::open(&paths.database).unwrap();
    assert_eq!(store.record_count().unwrap(), 3);
    assert_eq!(store.visited_count().unwrap(), 6);

    let unique = out.path().join(UNIQUE_DIR);
    let duplicate = out.path().join(DUPLICATE_DIR);
    let before = (files_under(&unique), files_under(&duplicate));
    let report = run(&store, src.path(), out.path(), jpg_config());
    assert_eq!(report.already_visited, 6);
    assert_eq!((files_under(&unique), files_under(&duplicate)), before);
}

#[test]
fn test_progress_record_tracks_run() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    for i in 0..(SAVE_INTERVAL + 5) {
        write(src.path(), &format!("f{i:03}.jpg"), format!("{i}").as_bytes());
    }
    let paths = StatePaths::resolve(None, out.path());
    let store = FingerprintStore::open(&paths.database).unwrap();

    let token = CancelToken::new();
    let sink = Arc::new(CancelAfter {
        token: token.clone(),
        after: SAVE_INTERVAL + 2,
    });
    Orchestrator::new(&store, jpg_config().with_progress_file(paths.progress.clone()))
        .with_space_probe(unlimited)
        .with_progress(sink)
        .with_cancel_token(token)
        .run(src.path(), out.path())
        .unwrap();

    let record = ProgressRecord::load(&paths.progress).unwrap().unwrap();
    assert!(!record.completed);
    assert_eq!(record.processed, SAVE_INTERVAL + 2);
    assert_eq!(record.total_candidates, SAVE_INTERVAL + 5);

    let report = Orchestrator::new(&store, jpg_config().with_progress_file(paths.progress.clone()))
        .with_space_probe(unlimited)
        .run(src.path(), out.path())
        .unwrap();
    assert_eq!(report.already_visited, SAVE_INTERVAL + 2);

    let record = ProgressRecord::load(&paths.progress).unwrap().unwrap();
    assert!(record.completed);
    assert_eq!(record.processed, record.total_candidates);
    assert!((record.fraction() - 1.0).abs() < f64::EPSILON);
}

#[test]
fn test_corrupt_progress_record_is_ignored() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    populate(src.path());
    let paths = StatePaths::resolve(None, out.path());
    std::fs::create_dir_all(paths.progress.parent().unwrap()).unwrap();
    std::fs::write(&paths.progress, b"{ not json").unwrap();
    let store = FingerprintStore::open(&paths.database).unwrap();

    let report = Orchestrator::new(&store, jpg_config().with_progress_file(paths.progress.clone()))
        .with_space_probe(unlimited)
        .run(src.path(), out.path())
        .unwrap();

    assert_eq!(report.processed, 6);
    assert!(ProgressRecord::load(&paths.progress).unwrap().unwrap().completed);
}

/// Leave the store as a run killed after renaming the copy of `path` into
/// `dest`, but before marking `path` visited, would leave it.
fn stop_after_copy(store: &FingerprintStore, path: &Path, dest: &Path) {
    let digest = Hasher::new().fingerprint(path).unwrap();
    store.record(&digest, path).unwrap();
    store.begin_copy(path, dest).unwrap();
    fs::create_dir_all(dest.parent().unwrap()).unwrap();
    fs::copy(path, dest).unwrap();
}

#[test]
fn test_copy_landed_before_visit_is_not_copied_again() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    let a = write(src.path(), "a.jpg", b"content");
    let store = FingerprintStore::open_in_memory().unwrap();
    let dest = out.path().join(UNIQUE_DIR).join("images").join("a.jpg");
    stop_after_copy(&store, &a, &dest);

    let report = run(&store, src.path(), out.path(), jpg_config());

    assert_eq!(report.unique, 1);
    assert_eq!(report.bytes_copied, 0);
    assert_eq!(
        files_under(&out.path().join(UNIQUE_DIR)),
        vec![Path::new("images/a.jpg").to_path_buf()]
    );
    assert!(store.is_visited(&a).unwrap());
    assert_eq!(store.pending_copy(&a).unwrap(), None);
}

#[test]
fn test_duplicate_copy_landed_before_visit_is_not_copied_again() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    write(src.path(), "a.jpg", b"same");
    let b = write(src.path(), "b.jpg", b"same");
    let store = FingerprintStore::open_in_memory().unwrap();

    // a.jpg finished normally; b.jpg stopped after its copy landed
    let first = run(&store, src.path(), out.path(), jpg_config());
    assert_eq!(first.duplicates, 1);
    let dup = out.path().join(DUPLICATE_DIR).join("images").join("b.jpg");
    let reference = tree_contents(out.path());

    let fresh = FingerprintStore::open_in_memory().unwrap();
    for (digest, path) in store.records().unwrap() {
        fresh.record(&digest, &path).unwrap();
    }
    for path in store.visited_paths().unwrap() {
        if path != b {
            fresh.mark_visited(&path).unwrap();
        }
    }
    fresh.begin_copy(&b, &dup).unwrap();

    let resumed = run(&fresh, src.path(), out.path(), jpg_config());

    assert_eq!(resumed.duplicates, 1);
    assert_eq!(resumed.already_visited, 1);
    assert_eq!(resumed.bytes_copied, 0);
    assert_eq!(tree_contents(out.path()), reference);
}

#[test]
fn test_mismatched_pending_copy_is_copied_afresh() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    let a = write(src.path(), "a.jpg", b"content");
    let store = FingerprintStore::open_in_memory().unwrap();
    let dest = out.path().join(UNIQUE_DIR).join("images").join("a.jpg");
    stop_after_copy(&store, &a, &dest);
    fs::write(&dest, b"something else").unwrap();

    let report = run(&store, src.path(), out.path(), jpg_config());

    assert_eq!(report.unique, 1);
    assert_eq!(report.bytes_copied, 7);
    let images = out.path().join(UNIQUE_DIR).join("images");
    assert_eq!(fs::read(images.join("a.jpg")).unwrap(), b"something else");
    assert_eq!(fs::read(images.join("a_1.jpg")).unwrap(), b"content");
}
