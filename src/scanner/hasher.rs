//! SHA-256 file fingerprints and byte-exact verification.
//!
//! # Overview
//!
//! [`Hasher`] streams a file through SHA-256 in fixed-size chunks so memory
//! stays bounded regardless of file size. [`identical`] compares two files
//! in lockstep and is used to confirm a fingerprint match before a file is
//! ever treated as a duplicate.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use super::HashError;

/// A 256-bit content fingerprint.
pub type Hash = [u8; 32];

/// Default read chunk size (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Largest accepted read chunk size (64 MiB).
///
/// Chunks are allocated up front, two at a time during verification.
pub const MAX_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// Clamp a requested chunk size into `1..=MAX_CHUNK_SIZE`.
#[must_use]
pub fn bounded_chunk_size(chunk_size: usize) -> usize {
    chunk_size.clamp(1, MAX_CHUNK_SIZE)
}

/// Anything that can turn a file into a content fingerprint.
///
/// The classifier only depends on this trait, which lets tests swap in a
/// fingerprinter that forces collisions.
pub trait Fingerprinter {
    /// Compute the fingerprint of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or a read fails.
    /// A partial read never produces a fingerprint.
    fn fingerprint(&self, path: &Path) -> Result<Hash, HashError>;
}

impl<T: Fingerprinter + ?Sized> Fingerprinter for &T {
    fn fingerprint(&self, path: &Path) -> Result<Hash, HashError> {
        (**self).fingerprint(path)
    }
}

/// Streaming SHA-256 fingerprinter.
#[derive(Debug, Clone)]
pub struct Hasher {
    chunk_size: usize,
}

impl Hasher {
    /// Create a hasher with the default 64 KiB chunk size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Create a hasher reading `chunk_size` bytes at a time.
    ///
    /// The size is clamped into `1..=MAX_CHUNK_SIZE`.
    #[must_use]
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: bounded_chunk_size(chunk_size),
        }
    }

    /// The configured chunk size in bytes.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fingerprinter for Hasher {
    fn fingerprint(&self, path: &Path) -> Result<Hash, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let mut reader = BufReader::with_capacity(self.chunk_size, file);
        let mut buffer = vec![0u8; self.chunk_size];
        let mut digest = Sha256::new();

        loop {
            let n = reader
                .read(&mut buffer)
                .map_err(|e| HashError::from_io(path, e))?;
            if n == 0 {
                break;
            }
            digest.update(&buffer[..n]);
        }

        Ok(digest.finalize().into())
    }
}

/// Check whether two files have byte-for-byte identical content.
///
/// Both files are read in lockstep in `chunk_size` pieces. Returns `false`
/// at the first differing chunk, including when one file ends before the
/// other, and `true` only once both reach end-of-data together.
///
/// # Errors
///
/// Returns [`HashError`] if either file cannot be opened or read.
pub fn identical(a: &Path, b: &Path, chunk_size: usize) -> Result<bool, HashError> {
    let chunk_size = bounded_chunk_size(chunk_size);
    let mut file_a = File::open(a).map_err(|e| HashError::from_io(a, e))?;
    let mut file_b = File::open(b).map_err(|e| HashError::from_io(b, e))?;

    let mut buf_a = vec![0u8; chunk_size];
    let mut buf_b = vec![0u8; chunk_size];

    loop {
        let n_a = fill_chunk(&mut file_a, &mut buf_a).map_err(|e| HashError::from_io(a, e))?;
        let n_b = fill_chunk(&mut file_b, &mut buf_b).map_err(|e| HashError::from_io(b, e))?;

        if n_a != n_b || buf_a[..n_a] != buf_b[..n_b] {
            return Ok(false);
        }
        if n_a == 0 {
            return Ok(true);
        }
    }
}

/// Read until `buf` is full or the reader is exhausted.
///
/// `Read::read` may return short counts before end-of-file, so chunks of
/// two streams only line up if each chunk is filled completely.
fn fill_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Convert a hash to its lowercase hex representation.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}
