// src/engine/mod.rs

//! Watch-session engine.
//!
//! The watcher reports binding firings, spawned runs report back when they
//! finish, and Ctrl-C asks the loop to stop. All of that flows through
//! [`RuntimeEvent`] into the [`runtime::WatchRuntime`] loop.

use std::path::PathBuf;

use crate::dag::RunReport;
use crate::errors::Result;
use crate::types::TaskName;

/// Events flowing into the runtime from the watcher, spawned runs and signal
/// handlers.
#[derive(Debug)]
pub enum RuntimeEvent {
    /// A watch binding matched a filesystem change.
    BindingFired { binding: usize, path: PathBuf },
    /// A run started for a binding has completed (or failed to plan).
    RunFinished {
        task: TaskName,
        report: Result<RunReport>,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod runtime;

pub use runtime::WatchRuntime;
