use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use figment::providers::Serialized;
use figment::Figment;
use tempfile::tempdir;
use uniqsort::cli::{Cli, Commands};
use uniqsort::config::{Config, ConfigError};

static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Clear all UNIQSORT_* environment variables to avoid interference.
fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("UNIQSORT_") {
            std::env::remove_var(key);
        }
    }
}

#[test]
fn test_config_defaults_extract() {
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .extract()
        .unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.chunk_size, 65_536);
    assert!(config.categorize);
    assert!(config.skip_hidden);
}

#[test]
fn test_config_load_from_toml() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
extensions = ["PNG", ".jpg", "image/"]
chunk_size = 4096
categorize = false
disk_margin = 0
output_root = "/sorted"

[categories]
pictures = [".png", ".jpg"]
"#,
    )
    .unwrap();

    let config = Config::load_from_path(&path).unwrap();

    assert_eq!(config.extensions, vec![".jpg", ".png", "image/"]);
    assert_eq!(config.chunk_size, 4096);
    assert!(!config.categorize);
    assert_eq!(config.disk_margin, 0);
    assert_eq!(config.output_root, Some(PathBuf::from("/sorted")));
    assert_eq!(config.categories.len(), 1);
    assert!(config.skip_hidden);
}

#[test]
fn test_env_overrides_toml() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "chunk_size = 4096\nskip_hidden = true\n").unwrap();

    std::env::set_var("UNIQSORT_CHUNK_SIZE", "8192");
    std::env::set_var("UNIQSORT_SKIP_HIDDEN", "false");
    let config = Config::load_from_path(&path);
    clear_env();

    let config = config.unwrap();
    assert_eq!(config.chunk_size, 8192);
    assert!(!config.skip_hidden);
}

#[test]
fn test_cli_overrides_config() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "chunk_size = 4096\noutput_root = \"/from-config\"\n").unwrap();
    let mut config = Config::load_from_path(&path).unwrap();

    let cli = Cli::try_parse_from([
        "uniqsort",
        "scan",
        "/photos",
        "-o",
        "/from-cli",
        "--chunk-size",
        "1KiB",
        "--ext",
        "gif",
        "--no-categories",
        "--include-hidden",
        "--state-dir",
        "/state",
    ])
    .unwrap();
    let Commands::Scan(args) = cli.command else {
        panic!("Expected Scan command");
    };
    config.apply_scan_args(&args);

    assert_eq!(config.chunk_size, 1024);
    assert_eq!(config.output_root, Some(PathBuf::from("/from-cli")));
    assert_eq!(config.extensions, vec![".gif"]);
    assert!(!config.categorize);
    assert!(!config.skip_hidden);
    assert_eq!(config.state_dir, Some(PathBuf::from("/state")));
}

#[test]
fn test_missing_file_uses_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();
    let dir = tempdir().unwrap();
    let config = Config::load_from_path(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_explicit_missing_file_is_error() {
    let dir = tempdir().unwrap();
    assert!(Config::load(Some(&dir.path().join("absent.toml"))).is_err());
}

#[test]
fn test_invalid_toml_is_error() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "chunk_size = \"lots\"").unwrap();
    assert!(Config::load_from_path(&path).is_err());
}

#[test]
fn test_unknown_keys_are_ignored() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "theme = \"dark\"\nchunk_size = 2048\n").unwrap();

    let config = Config::load_from_path(&path).unwrap();
    assert_eq!(config.chunk_size, 2048);
}

#[test]
fn test_zero_chunk_size_fails_validation() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "chunk_size = 0").unwrap();

    let config = Config::load_from_path(&path).unwrap();
    assert_eq!(config.validate(), Err(ConfigError::ZeroChunkSize));
}

#[test]
fn test_oversized_cli_chunk_size_fails_validation() {
    let mut config = Config::default();
    let cli = Cli::try_parse_from([
        "uniqsort",
        "scan",
        "/photos",
        "-o",
        "/out",
        "--chunk-size",
        "16TiB",
    ])
    .unwrap();
    let Commands::Scan(args) = cli.command else {
        panic!("Expected Scan command");
    };
    config.apply_scan_args(&args);

    assert!(matches!(
        config.validate(),
        Err(ConfigError::ChunkSizeTooLarge { .. })
    ));
}
