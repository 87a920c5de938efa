use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetpipe::dag::{TaskContext, TaskWork};
use assetpipe::errors::PipelineError;

/// Shared log of executed work, for asserting on execution order.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names recorded so far, in order.
    pub fn recorded(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.lock().unwrap().iter().filter(|n| *n == name).count()
    }

    fn push(&self, entry: String) {
        self.events.lock().unwrap().push(entry);
    }

    /// Work that records `name` and succeeds.
    pub fn work(&self, name: &str) -> impl TaskWork + 'static {
        self.delayed(name, Duration::ZERO)
    }

    /// Work that records `name:start`, sleeps, then records `name`.
    pub fn delayed(&self, name: &str, delay: Duration) -> impl TaskWork + 'static {
        let recorder = self.clone();
        let name = name.to_string();
        move |_ctx: TaskContext| {
            let recorder = recorder.clone();
            let name = name.clone();
            async move {
                if !delay.is_zero() {
                    recorder.push(format!("{name}:start"));
                    tokio::time::sleep(delay).await;
                }
                recorder.push(name);
                Ok::<(), PipelineError>(())
            }
        }
    }

    /// Work that records `name` and fails.
    pub fn failing(&self, name: &str) -> impl TaskWork + 'static {
        let recorder = self.clone();
        let name = name.to_string();
        move |_ctx: TaskContext| {
            let recorder = recorder.clone();
            let name = name.clone();
            async move {
                recorder.push(name.clone());
                Err::<(), PipelineError>(PipelineError::Other(anyhow::anyhow!(
                    "{name} failed on purpose"
                )))
            }
        }
    }
}
