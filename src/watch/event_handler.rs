// src/watch/event_handler.rs

//! Turns raw filesystem events into binding firings.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use notify::{Event, EventKind};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::fs::FileSystem;
use crate::watch::hash::{compute_hash_for_paths, record_if_changed, HashStore};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::WatchBindings;

/// Only content-affecting events count; access events are ignored.
pub fn is_relevant(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Bindings matched by any path of one event, each with the first path that
/// matched it. Ordered by binding id.
pub fn bindings_for_paths(
    root: &std::path::Path,
    paths: &[PathBuf],
    bindings: &WatchBindings,
) -> Vec<(usize, PathBuf)> {
    let mut fired: BTreeMap<usize, PathBuf> = BTreeMap::new();
    for path in paths {
        let Some(rel) = relative_str(root, path) else {
            warn!(path = ?path, root = ?root, "could not relativize event path");
            continue;
        };
        debug!(path = ?path, rel = %rel, "normalized event path");

        for binding in bindings.matching(&rel) {
            fired.entry(binding.id()).or_insert_with(|| path.clone());
        }
    }
    fired.into_iter().collect()
}

/// Stateful per-session event processor.
pub struct EventHandler {
    root: PathBuf,
    bindings: Arc<WatchBindings>,
    fs: Arc<dyn FileSystem>,
    hash_store: Box<dyn HashStore>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl EventHandler {
    pub fn new(
        root: PathBuf,
        bindings: Arc<WatchBindings>,
        fs: Arc<dyn FileSystem>,
        hash_store: Box<dyn HashStore>,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            root,
            bindings,
            fs,
            hash_store,
            runtime_tx,
        }
    }

    /// Record the current content hash of every hashing binding, so the
    /// first event after startup only fires on a real change.
    pub fn prime_hashes(&mut self) {
        for binding in self.bindings.iter().filter(|b| b.use_hash()) {
            let hash = binding
                .matching_files(self.fs.as_ref(), &self.root)
                .and_then(|files| compute_hash_for_paths(self.fs.as_ref(), &files));
            match hash {
                Ok(hash) => {
                    record_if_changed(self.hash_store.as_mut(), binding.id(), hash);
                }
                Err(e) => warn!(binding = binding.id(), error = %e, "failed to prime binding hash"),
            }
        }
    }

    /// Handle one notify event. Returns `false` once the runtime is gone.
    pub async fn handle(&mut self, event: Event) -> bool {
        if !is_relevant(&event.kind) {
            debug!(kind = ?event.kind, "ignoring event kind");
            return true;
        }

        for (id, path) in bindings_for_paths(&self.root, &event.paths, &self.bindings) {
            let Some(binding) = self.bindings.get(id) else {
                continue;
            };

            if binding.use_hash() {
                let hash = binding
                    .matching_files(self.fs.as_ref(), &self.root)
                    .and_then(|files| compute_hash_for_paths(self.fs.as_ref(), &files));
                match hash {
                    Ok(hash) => {
                        if !record_if_changed(self.hash_store.as_mut(), id, hash) {
                            info!(binding = id, path = ?path, "content unchanged; not firing");
                            continue;
                        }
                    }
                    Err(e) => {
                        warn!(binding = id, error = %e, "hashing failed; firing anyway");
                    }
                }
            }

            debug!(binding = id, path = ?path, tasks = ?binding.tasks(), "binding fired");
            if self
                .runtime_tx
                .send(RuntimeEvent::BindingFired { binding: id, path })
                .await
                .is_err()
            {
                debug!("runtime channel closed; dropping event");
                return false;
            }
        }
        true
    }
}
