//! Exact byte keys for paths kept in the fingerprint store.
//!
//! File systems treat names as opaque bytes: `café.jpg` in NFC and in NFD
//! are two different files on Linux, and non-UTF-8 names are legal. Keys
//! are therefore the path's raw OS bytes, never a normalised or lossy
//! string.

use std::path::{Path, PathBuf};

/// Bytes under which `path` is stored.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use uniqsort::scanner::path_utils::path_key;
///
/// assert_ne!(
///     path_key(Path::new("café.jpg")),
///     path_key(Path::new("cafe\u{0301}.jpg"))
/// );
/// ```
#[must_use]
pub fn path_key(path: &Path) -> Vec<u8> {
    path.as_os_str().as_encoded_bytes().to_vec()
}

/// Rebuild a path from bytes produced by [`path_key`].
#[cfg(unix)]
#[must_use]
pub fn path_from_key(key: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    PathBuf::from(OsStr::from_bytes(key))
}

/// Rebuild a path from bytes produced by [`path_key`].
///
/// Keys of valid Unicode paths convert back exactly; unpaired surrogates
/// are replaced.
#[cfg(not(unix))]
#[must_use]
pub fn path_from_key(key: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(key).into_owned())
}
