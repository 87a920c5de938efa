// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling each binding's include/exclude globs.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Optionally hashing matched content so a binding only fires on real
//!   changes.
//!
//! It does **not** run tasks; it only turns filesystem changes into
//! [`RuntimeEvent::BindingFired`](crate::engine::RuntimeEvent) events.

pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use hash::{compute_hash_for_paths, HashStore, MemoryHashStore};
pub use patterns::{bindings_from_config, default_bindings, WatchBinding, WatchBindings};
pub use watcher::{spawn_watcher, WatcherHandle};
