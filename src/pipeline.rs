// src/pipeline.rs

//! The site build: which tasks exist, what each one does and in which order
//! they depend on each other.
//!
//! ```text
//! default -> watch -> browser-sync
//! build-css -> clean-css
//! build-js -> clean-js
//! build-js-libs -> clean-js-libs
//! kraken -> kraken-compress
//! hint-js
//! ```
//!
//! Custom `[task.<name>]` entries from the config are registered alongside
//! the built-in tasks and may depend on them (and vice versa through
//! `[[watch]]` bindings).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::layout::AssetLayout;
use crate::config::model::ConfigFile;
use crate::dag::{no_work, TaskContext, TaskGraph, TaskWork};
use crate::engine::{RuntimeEvent, WatchRuntime};
use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;
use crate::server::{ProxyServer, ReloadHub, RunningProxy};
use crate::transform::command::run_shell;
use crate::transform::{
    TransformEnv, TransformInvocation, TransformOptions, TransformRegistry, BUNDLE_SCRIPTS, CLEAN,
    COMPILE_STYLESHEETS, COMPRESS_IMAGES, LINT_SCRIPTS, PUBLISH_COMPRESSED,
};
use crate::types::BuildMode;
use crate::watch::{bindings_from_config, spawn_watcher, WatchBindings};

/// Background services started by tasks, outliving the run that started them.
#[derive(Debug)]
pub struct Services {
    hub: ReloadHub,
    proxy: Mutex<Option<RunningProxy>>,
    shutdown: watch::Sender<bool>,
}

impl Services {
    pub fn new() -> Arc<Self> {
        let (shutdown, _) = watch::channel(false);
        Arc::new(Self {
            hub: ReloadHub::new(),
            proxy: Mutex::new(None),
            shutdown,
        })
    }

    pub fn reload_hub(&self) -> &ReloadHub {
        &self.hub
    }

    /// Address of the proxy server, once started.
    pub fn proxy_addr(&self) -> Option<SocketAddr> {
        self.lock_proxy().as_ref().map(|p| p.addr)
    }

    /// Whether anything is running in the background.
    pub fn has_background(&self) -> bool {
        self.lock_proxy().is_some()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Resolves once [`Services::request_shutdown`] has been called.
    pub async fn shutdown_requested(&self) {
        let mut rx = self.shutdown.subscribe();
        let _ = rx.wait_for(|requested| *requested).await;
    }

    /// Turn Ctrl-C into a shutdown request.
    pub fn listen_for_ctrl_c(self: &Arc<Self>) {
        let services = Arc::clone(self);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received; shutting down");
                    services.request_shutdown();
                }
                Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
            }
        });
    }

    /// Stop background services.
    pub fn stop(&self) {
        if let Some(proxy) = self.lock_proxy().take() {
            proxy.handle.abort();
            debug!(addr = %proxy.addr, "proxy server stopped");
        }
    }

    fn lock_proxy(&self) -> std::sync::MutexGuard<'_, Option<RunningProxy>> {
        self.proxy.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Everything needed to build the task graph for one project.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Arc<ConfigFile>,
    mode: BuildMode,
    layout: AssetLayout,
    fs: Arc<dyn FileSystem>,
    transforms: Arc<TransformRegistry>,
    services: Arc<Services>,
}

impl Pipeline {
    pub fn new(
        root: impl Into<PathBuf>,
        config: Arc<ConfigFile>,
        mode: BuildMode,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self> {
        let root = root.into();
        let layout = AssetLayout::from_config(&root, &config);
        let env = TransformEnv::new(&root, Arc::clone(&fs));
        let transforms = TransformRegistry::with_builtins(env, &config)?;

        Ok(Self {
            config,
            mode,
            layout,
            fs,
            transforms: Arc::new(transforms),
            services: Services::new(),
        })
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    pub fn layout(&self) -> &AssetLayout {
        &self.layout
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    fn options(&self) -> TransformOptions {
        TransformOptions::for_mode(self.mode)
    }

    /// Build and validate the full task graph.
    ///
    /// Fails when a prerequisite or a watch binding names a task that does
    /// not exist.
    pub fn build_graph(&self) -> Result<Arc<TaskGraph>> {
        let mut graph = TaskGraph::new();
        let layout = &self.layout;

        graph.register(
            "clean-css",
            &[],
            self.transform_work(
                CLEAN,
                TransformInvocation::new(
                    vec![layout.stylesheet_dist_files()],
                    layout.stylesheet_dist(),
                )
                .keep("all.css"),
            ),
        )?;
        graph.register(
            "build-css",
            &["clean-css"],
            self.transform_work(
                COMPILE_STYLESHEETS,
                TransformInvocation::new(vec![layout.stylesheet_entry()], layout.stylesheet_dist())
                    .output_name("all.css")
                    .options(self.options()),
            ),
        )?;

        graph.register(
            "clean-js",
            &[],
            self.transform_work(
                CLEAN,
                TransformInvocation::new(vec![layout.script_bundle_files()], layout.script_dist())
                    .keep("all.js"),
            ),
        )?;
        graph.register(
            "clean-js-libs",
            &[],
            self.transform_work(
                CLEAN,
                TransformInvocation::new(vec![layout.script_libs_files()], layout.script_dist())
                    .keep("libs.js"),
            ),
        )?;
        graph.register(
            "build-js-libs",
            &["clean-js-libs"],
            self.transform_work(
                BUNDLE_SCRIPTS,
                TransformInvocation::new(
                    self.config.dependencies().javascripts.clone(),
                    layout.script_dist(),
                )
                .output_name("libs.js")
                .options(self.options()),
            ),
        )?;
        graph.register(
            "build-js",
            &["clean-js"],
            self.transform_work(
                BUNDLE_SCRIPTS,
                TransformInvocation::new(vec![layout.script_sources()], layout.script_dist())
                    .output_name("all.js")
                    .options(self.options()),
            ),
        )?;
        graph.register(
            "hint-js",
            &[],
            self.transform_work(
                LINT_SCRIPTS,
                TransformInvocation::new(vec![layout.script_sources()], layout.script_dist()),
            ),
        )?;

        let kraken = self.config.kraken();
        graph.register(
            "kraken-compress",
            &[],
            self.transform_work(
                COMPRESS_IMAGES,
                TransformInvocation::new(vec![layout.compress_inputs()], layout.images_dir())
                    .options(
                        self.options()
                            .with_concurrency(kraken.concurrency)
                            .with_lossy(kraken.lossy),
                    ),
            ),
        )?;
        graph.register(
            "kraken",
            &["kraken-compress"],
            self.transform_work(
                PUBLISH_COMPRESSED,
                TransformInvocation::new(vec![layout.compress_inputs()], layout.images_dir()),
            ),
        )?;

        graph.register("browser-sync", &[], self.proxy_work())?;

        let bindings = Arc::new(bindings_from_config(&self.config, layout)?);
        graph.register("watch", &["browser-sync"], self.watch_work(Arc::clone(&bindings)))?;
        graph.register("default", &["watch"], no_work())?;

        for (name, task) in self.config.custom_tasks() {
            let after: Vec<&str> = task.after.iter().map(|s| s.as_str()).collect();
            graph.register(name.clone(), &after, self.shell_work(task.cmd.clone()))?;
        }

        graph.ensure_resolved()?;
        for task in bindings.referenced_tasks() {
            if !graph.contains(task) {
                return Err(PipelineError::UnknownTask(task.to_string()));
            }
        }

        info!(
            tasks = graph.task_names().count(),
            bindings = bindings.len(),
            mode = %self.mode,
            "task graph ready"
        );
        Ok(Arc::new(graph))
    }

    fn transform_work(
        &self,
        transform: &'static str,
        invocation: TransformInvocation,
    ) -> impl TaskWork + 'static {
        let transforms = Arc::clone(&self.transforms);
        move |ctx: TaskContext| {
            let transforms = Arc::clone(&transforms);
            let invocation = invocation.clone();
            async move {
                debug!(task = %ctx.task, run_id = ctx.run_id, transform, "running transform");
                transforms.invoke(transform, &invocation).await?;
                Ok::<(), PipelineError>(())
            }
        }
    }

    fn shell_work(&self, cmd: String) -> impl TaskWork + 'static {
        let root = self.root().to_path_buf();
        move |ctx: TaskContext| {
            let cmd = cmd.clone();
            let root = root.clone();
            async move {
                let output = run_shell(&cmd, &root, None).await?;
                let stdout = String::from_utf8_lossy(&output.stdout);
                for line in stdout.lines() {
                    info!(task = %ctx.task, "{line}");
                }
                Ok::<(), PipelineError>(())
            }
        }
    }

    fn proxy_work(&self) -> impl TaskWork + 'static {
        let services = Arc::clone(&self.services);
        let site_url = self.config.site_url().to_string();
        let server = self.config.server().clone();
        move |_ctx: TaskContext| {
            let services = Arc::clone(&services);
            let site_url = site_url.clone();
            let server = server.clone();
            async move {
                if let Some(addr) = services.proxy_addr() {
                    debug!(%addr, "proxy server already running");
                    return Ok(());
                }
                let proxy = ProxyServer::new(&site_url, server.port, services.reload_hub().clone())?;
                let running = proxy.start(server.open).await?;
                *services.lock_proxy() = Some(running);
                Ok::<(), PipelineError>(())
            }
        }
    }

    fn watch_work(&self, bindings: Arc<WatchBindings>) -> impl TaskWork + 'static {
        let services = Arc::clone(&self.services);
        let fs = Arc::clone(&self.fs);
        let root = self.root().to_path_buf();
        move |ctx: TaskContext| {
            let services = Arc::clone(&services);
            let fs = Arc::clone(&fs);
            let root = root.clone();
            let bindings = Arc::clone(&bindings);
            async move {
                let runtime = WatchRuntime::new(
                    Arc::clone(&ctx.graph),
                    Arc::clone(&bindings),
                    Some(services.reload_hub().clone()),
                );
                let _watcher = spawn_watcher(root, bindings, fs, runtime.sender())?;

                let tx = runtime.sender();
                let shutdown = Arc::clone(&services);
                tokio::spawn(async move {
                    shutdown.shutdown_requested().await;
                    let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
                });

                runtime.run().await
            }
        }
    }
}
