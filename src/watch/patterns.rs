// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::GlobSet;

use crate::config::layout::AssetLayout;
use crate::config::model::{ConfigFile, WatchBindingConfig};
use crate::fs::FileSystem;
use crate::fs::walk::{build_globset, collect_matching_files};
use crate::types::TaskName;

/// A set of glob patterns paired with the tasks to run when a matching file
/// changes.
///
/// Patterns are evaluated against paths relative to the project root, with
/// forward slashes. A path matches when any include pattern matches and no
/// exclude pattern does.
#[derive(Clone)]
pub struct WatchBinding {
    id: usize,
    patterns: Vec<String>,
    exclude_patterns: Vec<String>,
    include: GlobSet,
    exclude: GlobSet,
    tasks: Vec<TaskName>,
    use_hash: bool,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("id", &self.id)
            .field("patterns", &self.patterns)
            .field("exclude", &self.exclude_patterns)
            .field("tasks", &self.tasks)
            .field("use_hash", &self.use_hash)
            .finish()
    }
}

impl WatchBinding {
    pub fn new(
        id: usize,
        patterns: Vec<String>,
        exclude: Vec<String>,
        tasks: Vec<TaskName>,
        use_hash: bool,
    ) -> Result<Self> {
        Ok(Self {
            id,
            include: build_globset(&patterns)?,
            exclude: build_globset(&exclude)?,
            patterns,
            exclude_patterns: exclude,
            tasks,
            use_hash,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Tasks to run, in declared order.
    pub fn tasks(&self) -> &[TaskName] {
        &self.tasks
    }

    pub fn use_hash(&self) -> bool {
        self.use_hash
    }

    /// Does a root-relative path (forward slashes) belong to this binding?
    pub fn matches(&self, rel_path: &str) -> bool {
        self.include.is_match(rel_path) && !self.exclude.is_match(rel_path)
    }

    /// Every existing file under `root` this binding matches.
    pub fn matching_files(&self, fs: &dyn FileSystem, root: &Path) -> Result<Vec<PathBuf>> {
        collect_matching_files(fs, root, |rel| self.matches(rel))
    }
}

/// All bindings of one watch session, in registration order.
#[derive(Debug, Clone, Default)]
pub struct WatchBindings {
    bindings: Vec<WatchBinding>,
}

impl WatchBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding; returns its id.
    ///
    /// Any number of bindings may share a pattern.
    pub fn watch(&mut self, patterns: &[&str], tasks: &[&str]) -> Result<usize> {
        self.watch_with(
            patterns.iter().map(|s| s.to_string()).collect(),
            Vec::new(),
            tasks.iter().map(|s| s.to_string()).collect(),
            false,
        )
    }

    /// Register a binding with exclusions and optional content hashing.
    pub fn watch_with(
        &mut self,
        patterns: Vec<String>,
        exclude: Vec<String>,
        tasks: Vec<TaskName>,
        use_hash: bool,
    ) -> Result<usize> {
        let id = self.bindings.len();
        self.bindings
            .push(WatchBinding::new(id, patterns, exclude, tasks, use_hash)?);
        Ok(id)
    }

    pub fn get(&self, id: usize) -> Option<&WatchBinding> {
        self.bindings.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WatchBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings matching `rel_path`, in registration order.
    pub fn matching<'a>(&'a self, rel_path: &'a str) -> impl Iterator<Item = &'a WatchBinding> {
        self.bindings.iter().filter(move |b| b.matches(rel_path))
    }

    /// Every task name referenced by any binding.
    pub fn referenced_tasks(&self) -> impl Iterator<Item = &str> {
        self.bindings
            .iter()
            .flat_map(|b| b.tasks.iter().map(|t| t.as_str()))
    }
}

/// The site's standard bindings.
///
/// Stylesheet output lives inside the watched stylesheet tree, so it is
/// excluded to keep a build from re-triggering itself.
pub fn default_bindings(layout: &AssetLayout) -> Result<WatchBindings> {
    let mut bindings = WatchBindings::new();
    bindings.watch_with(
        vec![layout.rel("stylesheets/**/*")],
        vec![layout.rel("stylesheets/dist/**")],
        vec!["build-css".to_string()],
        false,
    )?;
    bindings.watch_with(
        vec![layout.rel("javascripts/src/*")],
        Vec::new(),
        vec!["build-js".to_string(), "build-js-libs".to_string()],
        false,
    )?;
    bindings.watch_with(
        vec![layout.rel("images/compress/*")],
        Vec::new(),
        vec!["kraken".to_string()],
        false,
    )?;
    Ok(bindings)
}

/// `[[watch]]` entries from the config when present, the defaults otherwise.
///
/// Configured patterns are relative to the project root.
pub fn bindings_from_config(cfg: &ConfigFile, layout: &AssetLayout) -> Result<WatchBindings> {
    let Some(configured) = cfg.watch_bindings() else {
        return default_bindings(layout);
    };

    let mut bindings = WatchBindings::new();
    for WatchBindingConfig {
        patterns,
        exclude,
        tasks,
        use_hash,
    } in configured
    {
        bindings.watch_with(patterns.clone(), exclude.clone(), tasks.clone(), *use_hash)?;
    }
    Ok(bindings)
}
