// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::engine::RuntimeEvent;
use crate::fs::FileSystem;
use crate::watch::event_handler::EventHandler;
use crate::watch::hash::MemoryHashStore;
use crate::watch::patterns::WatchBindings;

/// Keeps the underlying `RecommendedWatcher` alive. Dropping the handle
/// stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    forwarder: JoinHandle<()>,
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `root` recursively and send [`RuntimeEvent::BindingFired`] for
/// every binding a change matches.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    bindings: Arc<WatchBindings>,
    fs: Arc<dyn FileSystem>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    // notify calls back on its own thread; hop into async code over a channel.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let _ = event_tx.send(event);
            }
            Err(err) => error!(error = %err, "file watch error"),
        },
        Config::default(),
    )?;
    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!(root = ?root, bindings = bindings.len(), "file watcher started");

    let mut handler = EventHandler::new(
        root,
        bindings,
        fs,
        Box::new(MemoryHashStore::new()),
        runtime_tx,
    );
    handler.prime_hashes();

    let forwarder = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "received notify event");
            if !handler.handle(event).await {
                break;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        forwarder,
    })
}
