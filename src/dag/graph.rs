// src/dag/graph.rs

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, error, info, warn};

use crate::dag::report::{RunReport, TaskRecord};
use crate::dag::task_info::{Task, TaskRunState};
use crate::dag::work::{TaskContext, TaskWork};
use crate::errors::{PipelineError, Result};
use crate::types::TaskName;

/// Named tasks with prerequisites, validated as a DAG on registration.
///
/// Edge direction: task -> prerequisite. For
///
/// ```text
/// build-css after clean-css
/// ```
///
/// we add the edge `build-css -> clean-css`.
///
/// Prerequisites may name tasks that are registered later; those names live
/// in the graph as placeholders until they are registered, and
/// [`TaskGraph::ensure_resolved`] reports any that never were.
pub struct TaskGraph {
    dag: DiGraph<TaskName, ()>,
    nodes: HashMap<TaskName, NodeIndex>,
    tasks: HashMap<TaskName, Task>,
    /// Registration order, for listings.
    order: Vec<TaskName>,
    /// Monotonically increasing run ID.
    run_counter: AtomicU64,
}

impl std::fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGraph")
            .field("tasks", &self.order)
            .finish_non_exhaustive()
    }
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskGraph {
    pub fn new() -> Self {
        Self {
            dag: DiGraph::new(),
            nodes: HashMap::new(),
            tasks: HashMap::new(),
            order: Vec::new(),
            run_counter: AtomicU64::new(0),
        }
    }

    /// Register a task.
    ///
    /// Fails with [`PipelineError::DuplicateTask`] if `name` is taken and with
    /// [`PipelineError::CyclicDependency`] if any prerequisite already
    /// (transitively) depends on `name`. A rejected registration leaves the
    /// graph's edges and tasks unchanged.
    pub fn register(
        &mut self,
        name: impl Into<TaskName>,
        prerequisites: &[&str],
        work: impl TaskWork + 'static,
    ) -> Result<()> {
        let name = name.into();
        if self.tasks.contains_key(&name) {
            return Err(PipelineError::DuplicateTask(name));
        }

        let node = self.node_for(&name);
        let mut prereq_nodes = Vec::with_capacity(prerequisites.len());
        for prereq in prerequisites {
            let prereq_node = self.node_for(prereq);
            if *prereq == name || has_path_connecting(&self.dag, prereq_node, node, None) {
                return Err(PipelineError::CyclicDependency(format!(
                    "task '{name}' cannot depend on '{prereq}' because '{prereq}' already depends on '{name}'"
                )));
            }
            prereq_nodes.push(prereq_node);
        }

        for prereq_node in prereq_nodes {
            self.dag.update_edge(node, prereq_node, ());
        }

        let mut declared: Vec<TaskName> = Vec::with_capacity(prerequisites.len());
        for prereq in prerequisites {
            if !declared.iter().any(|p| p == prereq) {
                declared.push(prereq.to_string());
            }
        }

        debug!(task = %name, prerequisites = ?declared, "registered task");

        self.tasks.insert(
            name.clone(),
            Task {
                name: name.clone(),
                prerequisites: declared,
                work: Arc::new(work),
            },
        );
        self.order.push(name);
        Ok(())
    }

    /// Fail if any prerequisite names a task that was never registered.
    pub fn ensure_resolved(&self) -> Result<()> {
        for name in &self.order {
            for prereq in self.prerequisites_of(name) {
                if !self.tasks.contains_key(prereq) {
                    return Err(PipelineError::UnresolvedPrerequisite {
                        task: name.clone(),
                        prerequisite: prereq.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Task names in registration order.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    /// Declared prerequisites of a task (empty for unknown tasks).
    pub fn prerequisites_of(&self, name: &str) -> &[TaskName] {
        self.tasks
            .get(name)
            .map(|t| t.prerequisites.as_slice())
            .unwrap_or(&[])
    }

    /// Resolve the execution order for `name` without running anything.
    ///
    /// Depth-first, prerequisites in declared order, each task once; `name`
    /// itself comes last.
    pub fn plan(&self, name: &str) -> Result<Vec<TaskName>> {
        if !self.tasks.contains_key(name) {
            return Err(PipelineError::UnknownTask(name.to_string()));
        }

        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut in_progress = HashSet::new();
        self.visit(name, None, &mut visited, &mut in_progress, &mut order)?;
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        required_by: Option<&str>,
        visited: &mut HashSet<&'a str>,
        in_progress: &mut HashSet<&'a str>,
        order: &mut Vec<TaskName>,
    ) -> Result<()> {
        if visited.contains(name) {
            return Ok(());
        }

        let Some(task) = self.tasks.get(name) else {
            return Err(match required_by {
                Some(parent) => PipelineError::UnresolvedPrerequisite {
                    task: parent.to_string(),
                    prerequisite: name.to_string(),
                },
                None => PipelineError::UnknownTask(name.to_string()),
            });
        };

        if !in_progress.insert(name) {
            return Err(PipelineError::CyclicDependency(format!(
                "task '{name}' depends on itself"
            )));
        }

        for prereq in &task.prerequisites {
            self.visit(prereq, Some(name), visited, in_progress, order)?;
        }

        in_progress.remove(name);
        visited.insert(name);
        order.push(name.to_string());
        Ok(())
    }

    /// Run `name` after all of its prerequisites.
    ///
    /// The whole plan is resolved before any work starts, so an unknown task
    /// or unresolved prerequisite fails the call without side effects. Once
    /// running, a failing unit of work is logged and recorded, and the rest
    /// of the plan still runs.
    pub async fn run(self: &Arc<Self>, name: &str) -> Result<RunReport> {
        let plan = self.plan(name)?;
        let run_id = self.run_counter.fetch_add(1, Ordering::Relaxed) + 1;

        info!(run_id, task = %name, ?plan, "starting run");

        let mut records: Vec<TaskRecord> = Vec::with_capacity(plan.len());

        for task_name in &plan {
            let Some(task) = self.tasks.get(task_name) else {
                continue;
            };

            let failed_prereqs: Vec<&str> = task
                .prerequisites
                .iter()
                .filter(|p| {
                    records
                        .iter()
                        .any(|r| &r.name == *p && r.state == TaskRunState::Failed)
                })
                .map(|p| p.as_str())
                .collect();
            if !failed_prereqs.is_empty() {
                warn!(
                    run_id,
                    task = %task_name,
                    failed = ?failed_prereqs,
                    "prerequisite failed earlier in this run; continuing anyway"
                );
            }

            info!(run_id, task = %task_name, "starting task");
            let started = Instant::now();
            let ctx = TaskContext {
                graph: Arc::clone(self),
                task: task_name.clone(),
                run_id,
            };

            let outcome = task.work.call(ctx).await;
            let elapsed = started.elapsed();

            let record = match outcome {
                Ok(()) => {
                    info!(run_id, task = %task_name, ?elapsed, "finished task");
                    TaskRecord {
                        name: task_name.clone(),
                        state: TaskRunState::Succeeded,
                        error: None,
                        elapsed,
                    }
                }
                Err(err) => {
                    error!(
                        run_id,
                        task = %task_name,
                        error = %err,
                        "task failed; continuing with the rest of the run"
                    );
                    TaskRecord {
                        name: task_name.clone(),
                        state: TaskRunState::Failed,
                        error: Some(err.to_string()),
                        elapsed,
                    }
                }
            };
            records.push(record);
        }

        Ok(RunReport {
            run_id,
            requested: name.to_string(),
            records,
        })
    }

    fn node_for(&mut self, name: &str) -> NodeIndex {
        if let Some(idx) = self.nodes.get(name) {
            return *idx;
        }
        let idx = self.dag.add_node(name.to_string());
        self.nodes.insert(name.to_string(), idx);
        idx
    }
}
