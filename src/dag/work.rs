// src/dag/work.rs

//! Units of work attached to tasks.
//!
//! Work is always asynchronous: a task's work returns a boxed future and the
//! graph awaits it before moving on to dependents. Synchronous work is just a
//! future that is immediately ready.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::dag::graph::TaskGraph;
use crate::errors::{PipelineError, Result};
use crate::types::TaskName;

/// Future returned by a unit of work.
pub type WorkFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// What a unit of work gets to see while it runs.
#[derive(Clone)]
pub struct TaskContext {
    /// The graph the task belongs to, so long-running work (the watch
    /// session) can start further runs.
    pub graph: Arc<TaskGraph>,
    /// Name of the task being executed.
    pub task: TaskName,
    /// Identifier of the run this execution belongs to.
    pub run_id: u64,
}

impl std::fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("task", &self.task)
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

/// Trait abstracting a task's unit of work.
///
/// Any `Fn(TaskContext) -> impl Future<Output = Result<()>>` closure
/// implements it.
pub trait TaskWork: Send + Sync {
    fn call(&self, ctx: TaskContext) -> WorkFuture;
}

impl<F, Fut> TaskWork for F
where
    F: Fn(TaskContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn call(&self, ctx: TaskContext) -> WorkFuture {
        Box::pin(self(ctx))
    }
}

/// Work for aggregate tasks that only exist to pull in prerequisites.
pub fn no_work() -> impl TaskWork {
    |_ctx: TaskContext| async { Ok::<(), PipelineError>(()) }
}
