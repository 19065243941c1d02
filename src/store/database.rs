//! SQLite-backed fingerprint store.
//!
//! Two tables hold the store's data:
//!
//! * `file_records`: digest (primary key) → first-seen path. Rows are
//!   inserted once and never updated.
//! * `visited`: paths whose classification and placement completed.
//!
//! Paths are stored as their exact OS bytes (see [`path_key`]). A third,
//! internal table `pending_copies` remembers the destination of a copy in
//! flight until the file is marked visited, so a run killed between the
//! copy and the visited insert can find its copy again.
//!
//! Every mutating call runs as its own autocommit statement with
//! `synchronous=FULL`, so a successful return means the change is on disk
//! and a crash before return leaves no partial effect. Nothing needs to be
//! closed to keep committed data; [`FingerprintStore::close`] only releases
//! the connection early.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use crate::scanner::path_utils::{path_from_key, path_key};
use crate::scanner::{hash_to_hex, Hash};

/// Errors raised by the fingerprint store.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The database could not be opened or created.
    #[error("Failed to open fingerprint store at {path}: {reason}")]
    OpenFailed {
        /// Database path
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// A record for this digest already exists.
    ///
    /// Callers must `lookup` before `record`; seeing this means a bug.
    #[error("Digest {0} is already recorded")]
    DuplicateKey(String),

    /// A query failed.
    #[error("Fingerprint store query failed: {0}")]
    Query(#[from] rusqlite::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable digest → path mapping plus the visited set.
pub struct FingerprintStore {
    conn: Connection,
    db_path: PathBuf,
}

impl std::fmt::Debug for FingerprintStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FingerprintStore")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

/// Schema revision stored in `PRAGMA user_version`.
const SCHEMA_VERSION: i64 = 2;

fn now_secs() -> i64 {
    Utc::now().timestamp()
}

impl FingerprintStore {
    /// Open or create a store at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OpenFailed`] if the parent directory or the
    /// database cannot be created, or the schema cannot be applied.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let open_failed = |reason: String| StoreError::OpenFailed {
            path: path.to_path_buf(),
            reason,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| open_failed(e.to_string()))?;
            }
        }

        let conn = Connection::open(path).map_err(|e| open_failed(e.to_string()))?;
        let store = Self {
            conn,
            db_path: path.to_path_buf(),
        };
        store
            .init_schema()
            .map_err(|e| open_failed(e.to_string()))?;

        log::debug!("Opened fingerprint store at {}", path.display());
        Ok(store)
    }

    /// Open a throwaway in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if SQLite cannot create the database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn,
            db_path: PathBuf::from(":memory:"),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> rusqlite::Result<()> {
        // journal_mode returns a row, so it cannot go through execute()
        self.conn
            .query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))?;
        self.conn
            .execute_batch("PRAGMA synchronous=FULL; PRAGMA busy_timeout=5000;")?;

        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version < SCHEMA_VERSION {
            let has_tables: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'file_records'",
                [],
                |row| row.get(0),
            )?;
            if has_tables > 0 {
                log::warn!(
                    "Fingerprint store {} uses an older layout; starting from an empty store",
                    self.db_path.display()
                );
                self.conn.execute_batch(
                    "DROP TABLE IF EXISTS file_records;
                     DROP TABLE IF EXISTS visited;
                     DROP TABLE IF EXISTS pending_copies;",
                )?;
            }
        }

        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS file_records (
                 digest BLOB PRIMARY KEY,
                 first_seen_path BLOB NOT NULL,
                 recorded_at INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS visited (
                 path BLOB PRIMARY KEY,
                 visited_at INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS pending_copies (
                 path BLOB PRIMARY KEY,
                 destination BLOB NOT NULL
             );
             PRAGMA user_version = {SCHEMA_VERSION};"
        ))
    }

    /// Path of the underlying database file.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// First-seen path recorded for `digest`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the lookup fails.
    pub fn lookup(&self, digest: &Hash) -> StoreResult<Option<PathBuf>> {
        let key: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT first_seen_path FROM file_records WHERE digest = ?1",
                params![digest.as_slice()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(key.as_deref().map(path_from_key))
    }

    /// Insert a new record for `digest`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateKey`] if the digest already exists;
    /// the existing row is left untouched.
    pub fn record(&self, digest: &Hash, path: &Path) -> StoreResult<()> {
        let result = self.conn.execute(
            "INSERT INTO file_records (digest, first_seen_path, recorded_at) VALUES (?1, ?2, ?3)",
            params![digest.as_slice(), path_key(path), now_secs()],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateKey(hash_to_hex(digest)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Add `path` to the visited set. Marking twice is a no-op.
    ///
    /// Any pending copy recorded for `path` is dropped in the same
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the insert fails; in that case the
    /// pending copy is kept.
    pub fn mark_visited(&self, path: &Path) -> StoreResult<()> {
        let key = path_key(path);
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO visited (path, visited_at) VALUES (?1, ?2)",
            params![key, now_secs()],
        )?;
        tx.execute("DELETE FROM pending_copies WHERE path = ?1", params![key])?;
        tx.commit()?;
        Ok(())
    }

    /// Remember that `path` is about to be copied to `destination`.
    ///
    /// Replaces any earlier pending destination for `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the insert fails.
    pub fn begin_copy(&self, path: &Path, destination: &Path) -> StoreResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO pending_copies (path, destination) VALUES (?1, ?2)",
            params![path_key(path), path_key(destination)],
        )?;
        Ok(())
    }

    /// Destination of an unfinished copy of `path`, if one was started.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the lookup fails.
    pub fn pending_copy(&self, path: &Path) -> StoreResult<Option<PathBuf>> {
        let key: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT destination FROM pending_copies WHERE path = ?1",
                params![path_key(path)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(key.as_deref().map(path_from_key))
    }

    /// Whether `path` is in the visited set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the lookup fails.
    pub fn is_visited(&self, path: &Path) -> StoreResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM visited WHERE path = ?1",
                params![path_key(path)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Atomically empty both tables, along with any pending copies.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the transaction fails; in that case
    /// neither table is modified.
    pub fn clear(&mut self) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM file_records", [])?;
        tx.execute("DELETE FROM visited", [])?;
        tx.execute("DELETE FROM pending_copies", [])?;
        tx.commit()?;
        log::info!("Cleared fingerprint store at {}", self.db_path.display());
        Ok(())
    }

    /// Number of digest records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the count fails.
    pub fn record_count(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM file_records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Number of visited paths.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the count fails.
    pub fn visited_count(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM visited", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// All digest records, ordered by digest.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the query fails.
    pub fn records(&self) -> StoreResult<Vec<(Hash, PathBuf)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT digest, first_seen_path FROM file_records ORDER BY digest")?;
        let rows = stmt.query_map([], |row| {
            let bytes: Vec<u8> = row.get(0)?;
            let key: Vec<u8> = row.get(1)?;
            Ok((bytes, path_from_key(&key)))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (bytes, path) = row?;
            match <Hash>::try_from(bytes.as_slice()) {
                Ok(digest) => records.push((digest, path)),
                Err(_) => log::warn!("Ignoring malformed digest for {}", path.display()),
            }
        }
        Ok(records)
    }

    /// All visited paths, ordered by their byte keys.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the query fails.
    pub fn visited_paths(&self) -> StoreResult<Vec<PathBuf>> {
        let mut stmt = self.conn.prepare("SELECT path FROM visited ORDER BY path")?;
        let rows = stmt.query_map([], |row| row.get::<_, Vec<u8>>(0))?;
        let mut paths = Vec::new();
        for key in rows {
            paths.push(path_from_key(&key?));
        }
        Ok(paths)
    }

    /// Release the connection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if SQLite reports a failure on close.
    pub fn close(self) -> StoreResult<()> {
        self.conn.close().map_err(|(_, e)| StoreError::Query(e))
    }
}
