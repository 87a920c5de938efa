// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::BuildMode;

/// Default Kraken upload endpoint.
pub const DEFAULT_KRAKEN_ENDPOINT: &str = "https://api.kraken.io/v1/upload";

/// Configuration as read from disk, before validation.
///
/// ```toml
/// site_url = "http://localhost:8080"
/// coredna = false
/// production = false
///
/// [dependencies]
/// javascripts = ["node_modules/jquery/dist/jquery.js"]
///
/// [kraken]
/// key = "..."
/// secret = "..."
///
/// [server]
/// port = 3000
/// open = false
///
/// [[watch]]
/// patterns = ["source/stylesheets/**/*"]
/// exclude = ["source/stylesheets/dist/**"]
/// tasks = ["build-css"]
///
/// [task.deploy]
/// cmd = "rsync -a source/ host:/var/www"
/// after = ["build-css", "build-js"]
/// ```
///
/// The legacy `config.json` keys (`siteUrl`, `krakenKey`,
/// `krakenSecretKey`) are accepted as aliases.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default, alias = "siteUrl")]
    pub site_url: Option<String>,

    /// Selects the asset path prefix: `""` when true, `source/` otherwise.
    #[serde(default)]
    pub coredna: bool,

    #[serde(default)]
    pub production: bool,

    #[serde(default)]
    pub dependencies: DependenciesSection,

    #[serde(default)]
    pub kraken: KrakenSection,

    #[serde(default, alias = "krakenKey")]
    pub kraken_key: Option<String>,

    #[serde(default, alias = "krakenSecretKey")]
    pub kraken_secret_key: Option<String>,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub tools: ToolsSection,

    /// Overrides the built-in watch bindings when present.
    #[serde(default)]
    pub watch: Option<Vec<WatchBindingConfig>>,

    /// Extra shell-command tasks from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, CustomTaskConfig>,
}

/// `[dependencies]` section: third-party files bundled into `libs.js`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DependenciesSection {
    #[serde(default)]
    pub javascripts: Vec<String>,
}

/// `[kraken]` section: remote image compression.
#[derive(Debug, Clone, Deserialize)]
pub struct KrakenSection {
    #[serde(default)]
    pub key: String,

    #[serde(default)]
    pub secret: String,

    #[serde(default = "default_true")]
    pub lossy: bool,

    /// Maximum number of uploads in flight.
    #[serde(default = "default_kraken_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_kraken_endpoint")]
    pub endpoint: String,
}

impl Default for KrakenSection {
    fn default() -> Self {
        Self {
            key: String::new(),
            secret: String::new(),
            lossy: true,
            concurrency: default_kraken_concurrency(),
            endpoint: default_kraken_endpoint(),
        }
    }
}

/// `[server]` section: the local proxy.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Open a browser window on the proxy once it is listening.
    #[serde(default)]
    pub open: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            open: false,
        }
    }
}

/// `[tools]` section: external commands behind the transforms.
///
/// Each value is a shell command prefix; the transform appends its own
/// arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    #[serde(default = "default_sass")]
    pub sass: String,

    /// Reads a script bundle on stdin, writes the minified bundle to stdout.
    #[serde(default = "default_minify_js")]
    pub minify_js: String,

    #[serde(default = "default_lint_js")]
    pub lint_js: String,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            sass: default_sass(),
            minify_js: default_minify_js(),
            lint_js: default_lint_js(),
        }
    }
}

/// One `[[watch]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchBindingConfig {
    pub patterns: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    pub tasks: Vec<String>,

    /// Only fire when the content of the matched files actually changed.
    #[serde(default)]
    pub use_hash: bool,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomTaskConfig {
    /// The command to execute.
    pub cmd: String,

    /// Prerequisite task names.
    #[serde(default)]
    pub after: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_kraken_concurrency() -> usize {
    6
}

fn default_kraken_endpoint() -> String {
    DEFAULT_KRAKEN_ENDPOINT.to_string()
}

fn default_server_port() -> u16 {
    3000
}

fn default_sass() -> String {
    "sass".to_string()
}

fn default_minify_js() -> String {
    "uglifyjs --compress --mangle".to_string()
}

fn default_lint_js() -> String {
    "jshint".to_string()
}

/// Validated, immutable configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>`, which runs the checks in
/// `validate.rs`. Shared as `Arc<ConfigFile>` by every component.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    site_url: String,
    coredna: bool,
    production: bool,
    dependencies: DependenciesSection,
    kraken: KrakenSection,
    server: ServerSection,
    tools: ToolsSection,
    watch: Option<Vec<WatchBindingConfig>>,
    task: BTreeMap<String, CustomTaskConfig>,
}

impl ConfigFile {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new_unchecked(
        site_url: String,
        coredna: bool,
        production: bool,
        dependencies: DependenciesSection,
        kraken: KrakenSection,
        server: ServerSection,
        tools: ToolsSection,
        watch: Option<Vec<WatchBindingConfig>>,
        task: BTreeMap<String, CustomTaskConfig>,
    ) -> Self {
        Self {
            site_url,
            coredna,
            production,
            dependencies,
            kraken,
            server,
            tools,
            watch,
            task,
        }
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    pub fn coredna(&self) -> bool {
        self.coredna
    }

    /// Build mode selected by the config file (the CLI may override it).
    pub fn mode(&self) -> BuildMode {
        BuildMode::from_production_flag(self.production)
    }

    pub fn dependencies(&self) -> &DependenciesSection {
        &self.dependencies
    }

    pub fn kraken(&self) -> &KrakenSection {
        &self.kraken
    }

    pub fn server(&self) -> &ServerSection {
        &self.server
    }

    pub fn tools(&self) -> &ToolsSection {
        &self.tools
    }

    /// Watch bindings from the config, or `None` to use the built-in ones.
    pub fn watch_bindings(&self) -> Option<&[WatchBindingConfig]> {
        self.watch.as_deref()
    }

    pub fn custom_tasks(&self) -> &BTreeMap<String, CustomTaskConfig> {
        &self.task
    }
}
