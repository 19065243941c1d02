//! Eligibility filter and extension → category table.
//!
//! A file is eligible when its extension is in the configured set. If the
//! extension alone does not match, the MIME type guessed from the file name
//! is consulted: configured entries containing a `/` are MIME prefixes
//! (`image/`), and plain extensions also match a MIME subtype that ends with
//! them (`.jpeg` accepts `photo.jpe`, whose type is `image/jpeg`).
//!
//! Categories are only used for placement. Anything the table does not know
//! lands in [`OTHER_CATEGORY`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

/// Category used for extensions missing from the category table.
pub const OTHER_CATEGORY: &str = "other";

/// Normalize a user supplied extension to lowercase with a leading dot.
///
/// MIME prefixes (anything containing `/`) are only lowercased.
#[must_use]
pub fn normalize_extension(raw: &str) -> String {
    let trimmed = raw.trim().to_lowercase();
    if trimmed.contains('/') || trimmed.starts_with('.') || trimmed.is_empty() {
        trimmed
    } else {
        format!(".{trimmed}")
    }
}

/// Lowercased extension of `path` including the leading dot, if any.
fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
}

/// Decides which files take part in a scan.
#[derive(Debug, Clone, Default)]
pub struct EligibilityFilter {
    extensions: BTreeSet<String>,
    mime_prefixes: Vec<String>,
}

impl EligibilityFilter {
    /// Build a filter from raw extension / MIME prefix entries.
    ///
    /// An empty set accepts every file.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut extensions = BTreeSet::new();
        let mut mime_prefixes = Vec::new();
        for entry in entries {
            let normalized = normalize_extension(entry.as_ref());
            if normalized.is_empty() {
                continue;
            }
            if normalized.contains('/') {
                mime_prefixes.push(normalized);
            } else {
                extensions.insert(normalized);
            }
        }
        Self {
            extensions,
            mime_prefixes,
        }
    }

    /// Whether the filter accepts everything.
    #[must_use]
    pub fn accepts_all(&self) -> bool {
        self.extensions.is_empty() && self.mime_prefixes.is_empty()
    }

    /// Check whether `filename` should be scanned.
    #[must_use]
    pub fn is_eligible(&self, filename: &Path) -> bool {
        if self.accepts_all() {
            return true;
        }

        if let Some(ext) = dotted_extension(filename) {
            if self.extensions.contains(&ext) {
                return true;
            }
        }

        mime_guess::from_path(filename).iter().any(|mime| {
            let essence = mime.essence_str();
            if self.mime_prefixes.iter().any(|p| essence.starts_with(p.as_str())) {
                return true;
            }
            let subtype = mime.subtype().as_str();
            self.extensions.iter().any(|ext| {
                let bare = ext.trim_start_matches('.');
                !bare.is_empty() && subtype.ends_with(bare)
            })
        })
    }
}

/// Maps file extensions to destination category folders.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    by_extension: HashMap<String, String>,
}

impl CategoryTable {
    /// Build a table from `category -> [extensions]`.
    ///
    /// If an extension is listed under several categories, the
    /// alphabetically first category wins.
    #[must_use]
    pub fn new(categories: &BTreeMap<String, Vec<String>>) -> Self {
        let mut by_extension = HashMap::new();
        for (category, extensions) in categories {
            for ext in extensions {
                by_extension
                    .entry(normalize_extension(ext))
                    .or_insert_with(|| category.clone());
            }
        }
        Self { by_extension }
    }

    /// Default category mapping.
    #[must_use]
    pub fn default_categories() -> BTreeMap<String, Vec<String>> {
        let table: [(&str, &[&str]); 5] = [
            (
                "images",
                &[
                    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".tif", ".webp", ".heic",
                    ".svg", ".raw",
                ],
            ),
            (
                "documents",
                &[
                    ".pdf", ".doc", ".docx", ".txt", ".md", ".odt", ".rtf", ".xls", ".xlsx",
                    ".ppt", ".pptx", ".csv",
                ],
            ),
            ("audio", &[".mp3", ".wav", ".flac", ".aac", ".ogg", ".m4a"]),
            ("video", &[".mp4", ".mkv", ".avi", ".mov", ".wmv", ".webm"]),
            ("archives", &[".zip", ".tar", ".gz", ".7z", ".rar"]),
        ];
        table
            .iter()
            .map(|(name, exts)| {
                (
                    (*name).to_string(),
                    exts.iter().map(|e| (*e).to_string()).collect(),
                )
            })
            .collect()
    }

    /// Category folder for `path`.
    #[must_use]
    pub fn category_for(&self, path: &Path) -> &str {
        dotted_extension(path)
            .and_then(|ext| self.by_extension.get(&ext))
            .map_or(OTHER_CATEGORY, String::as_str)
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::new(&Self::default_categories())
    }
}
