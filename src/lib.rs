// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod transform;
pub mod types;
pub mod watch;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::cli::CliArgs;
use crate::config::loader::{default_config_path, load_and_validate};
use crate::dag::TaskGraph;
use crate::errors::{PipelineError, Result};
use crate::fs::RealFileSystem;
use crate::pipeline::Pipeline;

/// High-level entry point used by `main.rs`.
///
/// Loads the config, builds the task graph and runs the requested task. A
/// finished run exits normally even if some tasks failed; they have already
/// been reported. If the run left services behind (the proxy server), this
/// waits for Ctrl-C.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path(Path::new(".")),
    };
    if !config_path.is_file() {
        return Err(PipelineError::Config(format!(
            "config file not found: {}",
            config_path.display()
        )));
    }

    let cfg = Arc::new(load_and_validate(&config_path)?);
    let mode = args.mode_override().unwrap_or(cfg.mode());
    let root = config_root_dir(&config_path);
    info!(config = ?config_path, root = ?root, %mode, "loaded configuration");

    let pipeline = Pipeline::new(root, cfg, mode, Arc::new(RealFileSystem))?;
    let graph = pipeline.build_graph()?;

    if args.list {
        print_task_list(&graph, &mut std::io::stdout().lock())?;
        return Ok(());
    }

    if args.dry_run {
        print_plan(&graph, &args.task, &mut std::io::stdout().lock())?;
        return Ok(());
    }

    let services = Arc::clone(pipeline.services());
    services.listen_for_ctrl_c();

    let report = graph.run(&args.task).await?;
    report.log_summary();

    if services.has_background() && !services.is_shutdown_requested() {
        if let Some(addr) = services.proxy_addr() {
            info!("serving on http://{addr}; press Ctrl-C to stop");
        }
        services.shutdown_requested().await;
    }
    services.stop();
    Ok(())
}

/// Directory the config file lives in; all project paths are relative to it.
fn config_root_dir(config_path: &Path) -> PathBuf {
    let dir = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    dir.canonicalize().unwrap_or(dir)
}

/// `--list`: every task with its prerequisites, in registration order.
pub fn print_task_list(graph: &TaskGraph, out: &mut impl Write) -> Result<()> {
    for name in graph.task_names() {
        let prerequisites = graph.prerequisites_of(name);
        if prerequisites.is_empty() {
            writeln!(out, "{name}")?;
        } else {
            writeln!(out, "{name} <- {}", prerequisites.join(", "))?;
        }
    }
    Ok(())
}

/// `--dry-run`: the execution order for `task`, one task per line.
pub fn print_plan(graph: &TaskGraph, task: &str, out: &mut impl Write) -> Result<()> {
    for (idx, name) in graph.plan(task)?.iter().enumerate() {
        writeln!(out, "{:>2}. {name}", idx + 1)?;
    }
    Ok(())
}
