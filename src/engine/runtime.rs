// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::dag::TaskGraph;
use crate::errors::Result;
use crate::server::ReloadHub;
use crate::watch::WatchBindings;

use super::RuntimeEvent;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Reacts to [`RuntimeEvent`]s for the lifetime of a watch session.
///
/// Every firing starts one [`TaskGraph::run`] per bound task, in declared
/// order, without waiting for earlier ones; runs triggered by different
/// events may overlap.
pub struct WatchRuntime {
    graph: Arc<TaskGraph>,
    bindings: Arc<WatchBindings>,
    reload: Option<ReloadHub>,
    event_tx: mpsc::Sender<RuntimeEvent>,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    in_flight: usize,
}

impl fmt::Debug for WatchRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRuntime")
            .field("bindings", &self.bindings.len())
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl WatchRuntime {
    pub fn new(
        graph: Arc<TaskGraph>,
        bindings: Arc<WatchBindings>,
        reload: Option<ReloadHub>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            graph,
            bindings,
            reload,
            event_tx,
            event_rx,
            in_flight: 0,
        }
    }

    /// Sender for the watcher and signal handlers.
    pub fn sender(&self) -> mpsc::Sender<RuntimeEvent> {
        self.event_tx.clone()
    }

    /// Main event loop. Returns after [`RuntimeEvent::ShutdownRequested`].
    pub async fn run(mut self) -> Result<()> {
        info!(bindings = self.bindings.len(), "watch session started");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "runtime received event");
            match event {
                RuntimeEvent::BindingFired { binding, path } => {
                    self.dispatch(binding, &path);
                }
                RuntimeEvent::RunFinished { task, report } => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    self.finished(&task, report);
                }
                RuntimeEvent::ShutdownRequested => {
                    if self.in_flight > 0 {
                        warn!(in_flight = self.in_flight, "shutting down with runs still in progress");
                    }
                    break;
                }
            }
        }

        info!("watch session stopped");
        Ok(())
    }

    fn dispatch(&mut self, binding: usize, path: &std::path::Path) {
        let Some(binding) = self.bindings.get(binding) else {
            warn!(binding, "event for unknown binding");
            return;
        };

        info!(path = ?path, tasks = ?binding.tasks(), "change detected");
        for task in binding.tasks() {
            let graph = Arc::clone(&self.graph);
            let tx = self.event_tx.clone();
            let task = task.clone();
            self.in_flight += 1;
            tokio::spawn(async move {
                let report = graph.run(&task).await;
                let _ = tx.send(RuntimeEvent::RunFinished { task, report }).await;
            });
        }
    }

    fn finished(&self, task: &str, report: Result<crate::dag::RunReport>) {
        match report {
            Ok(report) => {
                report.log_summary();
                if report.any_succeeded() {
                    if let Some(hub) = &self.reload {
                        hub.reload(task);
                    }
                }
            }
            Err(e) => error!(task = %task, error = %e, "could not start run"),
        }
    }
}
