// src/dag/report.rs

//! Result types for a single `TaskGraph::run` call.

use std::time::Duration;

use tracing::{info, warn};

use crate::dag::task_info::TaskRunState;
use crate::types::TaskName;

/// Outcome of one task's work within a run.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub name: TaskName,
    /// `Succeeded` or `Failed`.
    pub state: TaskRunState,
    /// Rendered error for failed tasks.
    pub error: Option<String>,
    pub elapsed: Duration,
}

/// Structured result of a run.
///
/// Records appear in execution order, so tests can assert on ordering.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: u64,
    /// The task `run` was called with.
    pub requested: TaskName,
    pub records: Vec<TaskRecord>,
}

impl RunReport {
    /// Names of the tasks whose work was executed, in order.
    pub fn executed(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn failed(&self) -> impl Iterator<Item = &TaskRecord> {
        self.records
            .iter()
            .filter(|r| r.state == TaskRunState::Failed)
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }

    pub fn any_succeeded(&self) -> bool {
        self.records
            .iter()
            .any(|r| r.state == TaskRunState::Succeeded)
    }

    pub fn state_of(&self, task: &str) -> TaskRunState {
        self.records
            .iter()
            .find(|r| r.name == task)
            .map(|r| r.state)
            .unwrap_or(TaskRunState::NotInRun)
    }

    /// Emit a one-line summary plus one line per failed task.
    pub fn log_summary(&self) {
        let failed: Vec<&TaskRecord> = self.failed().collect();
        if failed.is_empty() {
            info!(
                run_id = self.run_id,
                task = %self.requested,
                tasks = self.records.len(),
                "run finished"
            );
            return;
        }

        for record in &failed {
            warn!(
                run_id = self.run_id,
                task = %record.name,
                error = record.error.as_deref().unwrap_or("unknown error"),
                "task failed during run"
            );
        }
        warn!(
            run_id = self.run_id,
            task = %self.requested,
            tasks = self.records.len(),
            failed = failed.len(),
            "run finished with failures"
        );
    }
}
