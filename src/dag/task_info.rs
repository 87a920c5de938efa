// src/dag/task_info.rs

//! Task metadata and per-run state.

use std::fmt;
use std::sync::Arc;

use crate::dag::work::TaskWork;
use crate::types::TaskName;

/// A registered task: its name, its prerequisites in declared order, and
/// its unit of work.
#[derive(Clone)]
pub struct Task {
    pub name: TaskName,
    pub prerequisites: Vec<TaskName>,
    pub work: Arc<dyn TaskWork>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("prerequisites", &self.prerequisites)
            .finish_non_exhaustive()
    }
}

/// State of a task within one run.
///
/// Runs keep their own state, so concurrent runs over the same graph never
/// observe each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// The task is not part of this run.
    NotInRun,
    Succeeded,
    /// Work returned an error (logged; the run continued).
    Failed,
}
