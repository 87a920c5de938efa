// src/types.rs

use std::fmt;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Build mode for transforms.
///
/// - `Production`: minify output, skip source maps.
/// - `Development`: keep source maps, skip minification (default).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    Production,
    #[default]
    Development,
}

impl BuildMode {
    pub fn from_production_flag(production: bool) -> Self {
        if production {
            BuildMode::Production
        } else {
            BuildMode::Development
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, BuildMode::Production)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Production => f.write_str("production"),
            BuildMode::Development => f.write_str("development"),
        }
    }
}
