// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::BuildMode;

/// Command-line arguments for `assetpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetpipe",
    version,
    about = "Build, watch and live-reload a site's stylesheets, scripts and images.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run, after all of its prerequisites.
    #[arg(value_name = "TASK", default_value = "watch")]
    pub task: String,

    /// Path to the config file.
    ///
    /// Default: `Assetpipe.toml` in the current directory, or a legacy
    /// `config.json` when only that exists.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Minify output and skip source maps, regardless of the config file.
    #[arg(long, conflicts_with = "development")]
    pub production: bool,

    /// Keep output readable and emit source maps, regardless of the config
    /// file.
    #[arg(long)]
    pub development: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the execution order for TASK without running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Print every task with its prerequisites and exit.
    #[arg(long)]
    pub list: bool,
}

impl CliArgs {
    /// Build mode forced on the command line, if any.
    pub fn mode_override(&self) -> Option<BuildMode> {
        match (self.production, self.development) {
            (true, _) => Some(BuildMode::Production),
            (_, true) => Some(BuildMode::Development),
            _ => None,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_watch() {
        let args = CliArgs::try_parse_from(["assetpipe"]).unwrap();
        assert_eq!(args.task, "watch");
        assert!(args.config.is_none());
        assert_eq!(args.mode_override(), None);
    }

    #[test]
    fn production_flag_overrides_mode() {
        let args = CliArgs::try_parse_from(["assetpipe", "build-css", "--production"]).unwrap();
        assert_eq!(args.task, "build-css");
        assert_eq!(args.mode_override(), Some(BuildMode::Production));
    }

    #[test]
    fn mode_flags_conflict() {
        assert!(CliArgs::try_parse_from(["assetpipe", "--production", "--development"]).is_err());
    }
}
