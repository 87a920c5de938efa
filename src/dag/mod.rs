// src/dag/mod.rs

//! Task graph and execution.
//!
//! - [`graph`] holds the validated DAG of tasks and runs them.
//! - [`work`] defines units of work and the context they run with.
//! - [`task_info`] provides task metadata and per-run task states.
//! - [`report`] defines the result type of a run.

pub mod graph;
pub mod report;
pub mod task_info;
pub mod work;

pub use graph::TaskGraph;
pub use report::{RunReport, TaskRecord};
pub use task_info::{Task, TaskRunState};
pub use work::{no_work, TaskContext, TaskWork, WorkFuture};
