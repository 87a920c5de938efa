#![allow(dead_code)]

use std::collections::BTreeMap;

use assetpipe::config::{ConfigFile, CustomTaskConfig, RawConfigFile, WatchBindingConfig};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    /// Starts from an empty config on a `coredna` layout, so asset paths
    /// carry no `source/` prefix.
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                coredna: true,
                task: BTreeMap::new(),
                ..RawConfigFile::default()
            },
        }
    }

    pub fn site_url(mut self, url: &str) -> Self {
        self.config.site_url = Some(url.to_string());
        self
    }

    pub fn coredna(mut self, val: bool) -> Self {
        self.config.coredna = val;
        self
    }

    pub fn production(mut self, val: bool) -> Self {
        self.config.production = val;
        self
    }

    pub fn dependency(mut self, script: &str) -> Self {
        self.config.dependencies.javascripts.push(script.to_string());
        self
    }

    pub fn sass(mut self, cmd: &str) -> Self {
        self.config.tools.sass = cmd.to_string();
        self
    }

    pub fn minifier(mut self, cmd: &str) -> Self {
        self.config.tools.minify_js = cmd.to_string();
        self
    }

    pub fn linter(mut self, cmd: &str) -> Self {
        self.config.tools.lint_js = cmd.to_string();
        self
    }

    pub fn kraken(mut self, endpoint: &str, key: &str, secret: &str) -> Self {
        self.config.kraken.endpoint = endpoint.to_string();
        self.config.kraken.key = key.to_string();
        self.config.kraken.secret = secret.to_string();
        self
    }

    pub fn kraken_concurrency(mut self, n: usize) -> Self {
        self.config.kraken.concurrency = n;
        self
    }

    pub fn server_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn watch(mut self, patterns: &[&str], tasks: &[&str]) -> Self {
        self.config
            .watch
            .get_or_insert_with(Vec::new)
            .push(WatchBindingConfig {
                patterns: patterns.iter().map(|s| s.to_string()).collect(),
                exclude: Vec::new(),
                tasks: tasks.iter().map(|s| s.to_string()).collect(),
                use_hash: false,
            });
        self
    }

    pub fn task(mut self, name: &str, cmd: &str, after: &[&str]) -> Self {
        self.config.task.insert(
            name.to_string(),
            CustomTaskConfig {
                cmd: cmd.to_string(),
                after: after.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
