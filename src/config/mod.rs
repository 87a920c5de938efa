// src/config/mod.rs

//! Configuration loading and validation for assetpipe.
//!
//! Responsibilities:
//! - Define the TOML/JSON-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it into an immutable [`ConfigFile`] (`validate.rs`).
//! - Derive the asset file layout (`layout.rs`).

pub mod layout;
pub mod loader;
pub mod model;
pub mod validate;

pub use layout::AssetLayout;
pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, CustomTaskConfig, DependenciesSection, KrakenSection, RawConfigFile,
    ServerSection, ToolsSection, WatchBindingConfig,
};
