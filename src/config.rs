//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML config file (platform config dir, or `--config PATH`)
//! 3. `UNIQSORT_*` environment variables (`__` separates nested keys)
//! 4. CLI flags ([`Config::apply_scan_args`])
//!
//! ```toml
//! extensions = [".jpg", ".png", "image/"]
//! chunk_size = 65536
//! categorize = true
//! disk_margin = 104857600
//!
//! [categories]
//! images = [".jpg", ".png"]
//! raw = [".cr2", ".nef"]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::ScanArgs;
use crate::dedupe::{ScanConfig, DEFAULT_DISK_MARGIN};
use crate::scanner::filter::normalize_extension;
use crate::scanner::hasher::{DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};
use crate::scanner::CategoryTable;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "UNIQSORT_";

/// Extensions scanned when nothing else is configured.
pub const DEFAULT_EXTENSIONS: [&str; 7] =
    [".bmp", ".gif", ".jpeg", ".jpg", ".png", ".tiff", ".webp"];

const KNOWN_KEYS: [&str; 8] = [
    "extensions",
    "chunk_size",
    "categorize",
    "skip_hidden",
    "disk_margin",
    "state_dir",
    "output_root",
    "categories",
];

/// Configuration validation failures.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `chunk_size` must be positive.
    #[error("chunk_size must be greater than zero")]
    ZeroChunkSize,

    /// `chunk_size` exceeds [`MAX_CHUNK_SIZE`].
    #[error("chunk_size {size} exceeds the maximum of {max} bytes")]
    ChunkSizeTooLarge {
        /// Configured size
        size: usize,
        /// Largest accepted size
        max: usize,
    },

    /// A category name cannot be used as a folder name.
    #[error("Invalid category name '{0}': must be a single non-empty path component")]
    InvalidCategory(String),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Eligible extensions (`.jpg`) and MIME prefixes (`image/`).
    /// Empty means every file.
    pub extensions: Vec<String>,
    /// Read chunk size in bytes.
    pub chunk_size: usize,
    /// Subdivide destination trees into category folders.
    pub categorize: bool,
    /// Skip hidden files and directories.
    pub skip_hidden: bool,
    /// Free space kept on the destination disk, in bytes.
    pub disk_margin: u64,
    /// Where the store and progress record live.
    /// Defaults to `<output_root>/.uniqsort`.
    pub state_dir: Option<PathBuf>,
    /// Output root used when `--output-dir` is not given.
    pub output_root: Option<PathBuf>,
    /// Category folder → extensions.
    pub categories: BTreeMap<String, Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            categorize: true,
            skip_hidden: true,
            disk_margin: DEFAULT_DISK_MARGIN,
            state_dir: None,
            output_root: None,
            categories: CategoryTable::default_categories(),
        }
    }
}

impl Config {
    /// Load from `path` if given, otherwise from the default platform path.
    ///
    /// A missing default config file is not an error. An explicitly
    /// requested file must exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit file is missing or any layer fails
    /// to parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Self::load_from_path(path)
            }
            None => match Self::default_path() {
                Some(path) => Self::load_from_path(&path),
                None => {
                    log::debug!("No platform config directory, using defaults");
                    Self::from_figment(Self::figment(None))
                }
            },
        }
    }

    /// Load defaults, the TOML file at `path` and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or an environment value cannot be parsed.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if path.exists() {
            log::debug!("Loading config from {}", path.display());
            warn_unknown_keys(path);
        }
        Self::from_figment(Self::figment(Some(path)))
    }

    /// The provider stack: defaults, then TOML, then environment.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let mut config: Self = figment
            .extract()
            .context("Failed to load configuration")?;
        config.extensions = config
            .extensions
            .iter()
            .map(|e| normalize_extension(e))
            .filter(|e| !e.is_empty())
            .collect();
        config.extensions.sort();
        config.extensions.dedup();
        Ok(config)
    }

    /// Default platform config path (`.../uniqsort/config.toml`).
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "uniqsort", "uniqsort")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Check values that would make a run misbehave.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::ChunkSizeTooLarge {
                size: self.chunk_size,
                max: MAX_CHUNK_SIZE,
            });
        }
        for name in self.categories.keys() {
            let mut components = Path::new(name).components();
            let single_normal = matches!(
                (components.next(), components.next()),
                (Some(std::path::Component::Normal(_)), None)
            );
            if !single_normal {
                return Err(ConfigError::InvalidCategory(name.clone()));
            }
        }
        Ok(())
    }

    /// Override settings with flags given on the command line.
    pub fn apply_scan_args(&mut self, args: &ScanArgs) {
        if !args.extensions.is_empty() {
            self.extensions = args
                .extensions
                .iter()
                .map(|e| normalize_extension(e))
                .filter(|e| !e.is_empty())
                .collect();
        }
        if let Some(chunk_size) = args.chunk_size {
            self.chunk_size = usize::try_from(chunk_size).unwrap_or(usize::MAX);
        }
        if args.no_categories {
            self.categorize = false;
        }
        if args.include_hidden {
            self.skip_hidden = false;
        }
        if let Some(margin) = args.disk_margin {
            self.disk_margin = margin;
        }
        if let Some(state_dir) = &args.state_dir {
            self.state_dir = Some(state_dir.clone());
        }
        if let Some(output_dir) = &args.output_dir {
            self.output_root = Some(output_dir.clone());
        }
    }

    /// Build the orchestrator settings.
    #[must_use]
    pub fn scan_config(&self) -> ScanConfig {
        let mut config = ScanConfig::default()
            .with_extensions(&self.extensions)
            .with_categories(CategoryTable::new(&self.categories))
            .with_categorize(self.categorize)
            .with_skip_hidden(self.skip_hidden)
            .with_chunk_size(self.chunk_size)
            .with_disk_margin(self.disk_margin);
        if let Some(state_dir) = &self.state_dir {
            config = config.with_exclude_dir(state_dir.clone());
        }
        config
    }
}

fn warn_unknown_keys(path: &Path) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };
    let Ok(table) = content.parse::<toml::Table>() else {
        return;
    };
    for key in table.keys() {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            log::warn!("Ignoring unknown config key '{}' in {}", key, path.display());
        }
    }
}
