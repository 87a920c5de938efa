// src/config/validate.rs

use reqwest::Url;

use crate::config::model::{ConfigFile, RawConfigFile, WatchBindingConfig};
use crate::errors::{PipelineError, Result};
use crate::fs::walk::build_globset;

/// Proxy upstream used when the config does not name one.
pub const DEFAULT_SITE_URL: &str = "http://localhost:8080";

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PipelineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let mut kraken = raw.kraken;
        if kraken.key.is_empty() {
            if let Some(key) = raw.kraken_key {
                kraken.key = key;
            }
        }
        if kraken.secret.is_empty() {
            if let Some(secret) = raw.kraken_secret_key {
                kraken.secret = secret;
            }
        }

        Ok(ConfigFile::new_unchecked(
            raw.site_url.unwrap_or_else(|| DEFAULT_SITE_URL.to_string()),
            raw.coredna,
            raw.production,
            raw.dependencies,
            kraken,
            raw.server,
            raw.tools,
            raw.watch,
            raw.task,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_site_url(cfg)?;
    validate_kraken(cfg)?;
    validate_tools(cfg)?;
    if let Some(bindings) = &cfg.watch {
        validate_watch_bindings(bindings)?;
    }
    validate_custom_tasks(cfg)?;
    Ok(())
}

fn validate_site_url(cfg: &RawConfigFile) -> Result<()> {
    let Some(site_url) = &cfg.site_url else {
        return Ok(());
    };

    let url = Url::parse(site_url).map_err(|e| {
        PipelineError::Config(format!("site_url '{site_url}' is not a valid URL: {e}"))
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(PipelineError::Config(format!(
            "site_url '{site_url}' must use http or https"
        )));
    }

    Ok(())
}

fn validate_kraken(cfg: &RawConfigFile) -> Result<()> {
    if cfg.kraken.concurrency == 0 {
        return Err(PipelineError::Config(
            "[kraken].concurrency must be >= 1 (got 0)".to_string(),
        ));
    }
    Url::parse(&cfg.kraken.endpoint).map_err(|e| {
        PipelineError::Config(format!(
            "[kraken].endpoint '{}' is not a valid URL: {e}",
            cfg.kraken.endpoint
        ))
    })?;
    Ok(())
}

fn validate_tools(cfg: &RawConfigFile) -> Result<()> {
    let tools = [
        ("sass", &cfg.tools.sass),
        ("minify_js", &cfg.tools.minify_js),
        ("lint_js", &cfg.tools.lint_js),
    ];
    for (name, cmd) in tools {
        if cmd.trim().is_empty() {
            return Err(PipelineError::Config(format!(
                "[tools].{name} must not be empty"
            )));
        }
    }
    Ok(())
}

fn validate_watch_bindings(bindings: &[WatchBindingConfig]) -> Result<()> {
    for (idx, binding) in bindings.iter().enumerate() {
        if binding.patterns.is_empty() {
            return Err(PipelineError::Config(format!(
                "[[watch]] entry #{idx} must list at least one pattern"
            )));
        }
        if binding.tasks.is_empty() {
            return Err(PipelineError::Config(format!(
                "[[watch]] entry #{idx} must list at least one task"
            )));
        }
        build_globset(&binding.patterns)
            .and_then(|_| build_globset(&binding.exclude))
            .map_err(|e| PipelineError::Config(format!("[[watch]] entry #{idx}: {e:#}")))?;
    }
    Ok(())
}

fn validate_custom_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if task.cmd.trim().is_empty() {
            return Err(PipelineError::Config(format!(
                "task '{name}' has an empty `cmd`"
            )));
        }
        if task.after.iter().any(|dep| dep == name) {
            return Err(PipelineError::CyclicDependency(format!(
                "task '{name}' cannot depend on itself in `after`"
            )));
        }
    }
    Ok(())
}
