// src/transform/mod.rs

//! Asset transforms.
//!
//! A transform turns a set of input files into output files. The task graph
//! only talks to the [`TransformRegistry`]: it asks for a transform by name,
//! hands it a [`TransformInvocation`] and inspects the returned `Result`.
//!
//! - [`clean`] deletes build output.
//! - [`stylesheet`] compiles Sass through an external compiler.
//! - [`script`] concatenates scripts, with [`sourcemap`] in development and an
//!   external minifier in production.
//! - [`lint`] runs an external linter over scripts.
//! - [`kraken`] sends images to the Kraken compression API.
//! - [`publish`] clears compressed images out of the transient directory.
//! - [`command`] runs shell commands for the transforms above and for
//!   custom tasks.

pub mod clean;
pub mod command;
pub mod kraken;
pub mod lint;
pub mod publish;
pub mod script;
pub mod sourcemap;
pub mod stylesheet;

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::model::ConfigFile;
use crate::fs::FileSystem;
use crate::types::BuildMode;

/// Names of the built-in transforms.
pub const CLEAN: &str = "clean";
pub const COMPILE_STYLESHEETS: &str = "compile-stylesheets";
pub const BUNDLE_SCRIPTS: &str = "bundle-scripts";
pub const LINT_SCRIPTS: &str = "lint-scripts";
pub const COMPRESS_IMAGES: &str = "compress-images";
pub const PUBLISH_COMPRESSED: &str = "publish-compressed";

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("unknown transform: {0}")]
    UnknownTransform(String),

    #[error("failed to start `{tool}`: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{tool}` exited with status {code}: {stderr}")]
    Tool {
        tool: String,
        code: i32,
        stderr: String,
    },

    #[error("lint reported problems in {files} file(s):\n{report}")]
    Lint { files: usize, report: String },

    #[error("remote compression of {path} failed: {message}")]
    Remote { path: PathBuf, message: String },

    #[error("{failed} of {total} file(s) could not be processed")]
    Partial { failed: usize, total: usize },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("filesystem error: {0:#}")]
    FileSystem(#[from] anyhow::Error),
}

/// Named options for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOptions {
    pub minify: bool,
    pub source_maps: bool,
    /// Upper bound on parallel work inside the transform.
    pub concurrency: usize,
    /// Allow lossy image compression.
    pub lossy: bool,
}

impl TransformOptions {
    /// Production minifies and drops source maps; development does the
    /// opposite.
    pub fn for_mode(mode: BuildMode) -> Self {
        Self {
            minify: mode.is_production(),
            source_maps: !mode.is_production(),
            concurrency: 1,
            lossy: true,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_lossy(mut self, lossy: bool) -> Self {
        self.lossy = lossy;
        self
    }
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self::for_mode(BuildMode::default())
    }
}

/// One request to a transform. Built fresh for every task run.
#[derive(Debug, Clone)]
pub struct TransformInvocation {
    /// Ordered input patterns (globs or literal paths), relative to the
    /// project root.
    pub inputs: Vec<String>,
    /// Where produced files go.
    pub output_dir: PathBuf,
    /// File name of the single output for transforms that produce one.
    pub output_name: Option<String>,
    /// File names a destructive transform must leave in place.
    pub keep: Vec<String>,
    pub options: TransformOptions,
}

impl TransformInvocation {
    pub fn new(inputs: Vec<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            inputs,
            output_dir: output_dir.into(),
            output_name: None,
            keep: Vec::new(),
            options: TransformOptions::default(),
        }
    }

    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    pub fn keep(mut self, file_name: impl Into<String>) -> Self {
        self.keep.push(file_name.into());
        self
    }

    /// Whether `path` is protected by [`TransformInvocation::keep`].
    pub fn is_kept(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.keep.iter().any(|k| k == name))
    }

    pub fn options(mut self, options: TransformOptions) -> Self {
        self.options = options;
        self
    }

    /// `output_dir/output_name`, or `output_dir/fallback` when unnamed.
    pub fn output_path(&self, fallback: &str) -> PathBuf {
        self.output_dir
            .join(self.output_name.as_deref().unwrap_or(fallback))
    }
}

/// Shared environment handed to every transform.
#[derive(Debug, Clone)]
pub struct TransformEnv {
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
}

impl TransformEnv {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Expand invocation inputs against the project root.
    pub fn expand(&self, inputs: &[String]) -> Result<Vec<PathBuf>, TransformError> {
        Ok(crate::fs::expand_inputs(self.fs.as_ref(), &self.root, inputs)?)
    }
}

pub type TransformFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<PathBuf>, TransformError>> + Send + 'a>>;

/// A content transformation.
pub trait Transform: Send + Sync {
    /// Produce output files for `invocation`, returning their paths.
    fn invoke<'a>(
        &'a self,
        env: &'a TransformEnv,
        invocation: &'a TransformInvocation,
    ) -> TransformFuture<'a>;
}

/// Maps transform names to implementations.
pub struct TransformRegistry {
    env: TransformEnv,
    transforms: BTreeMap<String, Arc<dyn Transform>>,
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("root", &self.env.root)
            .field("transforms", &self.transforms.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TransformRegistry {
    pub fn new(env: TransformEnv) -> Self {
        Self {
            env,
            transforms: BTreeMap::new(),
        }
    }

    /// Registry with every built-in transform, configured from `cfg`.
    pub fn with_builtins(env: TransformEnv, cfg: &ConfigFile) -> Result<Self, TransformError> {
        let tools = cfg.tools();
        let mut registry = Self::new(env);
        registry.insert(CLEAN, clean::Clean);
        registry.insert(
            COMPILE_STYLESHEETS,
            stylesheet::CompileStylesheets::new(tools.sass.clone()),
        );
        registry.insert(
            BUNDLE_SCRIPTS,
            script::BundleScripts::new(tools.minify_js.clone()),
        );
        registry.insert(LINT_SCRIPTS, lint::LintScripts::new(tools.lint_js.clone()));
        registry.insert(
            COMPRESS_IMAGES,
            kraken::CompressImages::from_config(cfg.kraken())?,
        );
        registry.insert(PUBLISH_COMPRESSED, publish::PublishCompressed);
        Ok(registry)
    }

    pub fn insert(&mut self, name: impl Into<String>, transform: impl Transform + 'static) {
        self.transforms.insert(name.into(), Arc::new(transform));
    }

    /// Look up `name` and run it.
    pub async fn invoke(
        &self,
        name: &str,
        invocation: &TransformInvocation,
    ) -> Result<Vec<PathBuf>, TransformError> {
        let transform = self
            .transforms
            .get(name)
            .ok_or_else(|| TransformError::UnknownTransform(name.to_string()))?;

        debug!(transform = %name, inputs = ?invocation.inputs, output_dir = ?invocation.output_dir, "invoking transform");
        let produced = transform.invoke(&self.env, invocation).await?;
        info!(transform = %name, produced = produced.len(), "transform finished");
        Ok(produced)
    }
}
