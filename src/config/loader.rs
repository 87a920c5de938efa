// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Default config file name, looked up in the current working directory.
pub const DEFAULT_CONFIG_FILE: &str = "Assetpipe.toml";

/// Legacy config file name, used when [`DEFAULT_CONFIG_FILE`] is absent.
pub const LEGACY_CONFIG_FILE: &str = "config.json";

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// `.json` files are parsed as JSON, everything else as TOML. This only
/// performs deserialization; use [`load_and_validate`] for semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let config: RawConfigFile = if is_json {
        serde_json::from_str(&contents)?
    } else {
        toml::from_str(&contents)?
    };

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// This is the recommended entry point for the rest of the application.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Resolve which config file to use when `--config` was not given.
///
/// Prefers `Assetpipe.toml`, falls back to a legacy `config.json` in the same
/// directory, and otherwise returns the TOML path (so the error names it).
pub fn default_config_path(dir: &Path) -> PathBuf {
    let toml_path = dir.join(DEFAULT_CONFIG_FILE);
    if toml_path.is_file() {
        return toml_path;
    }

    let legacy = dir.join(LEGACY_CONFIG_FILE);
    if legacy.is_file() {
        return legacy;
    }

    toml_path
}
