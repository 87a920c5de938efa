// src/watch/hash.rs

//! Content hashing for bindings with `use_hash = true`.
//!
//! A binding only fires when the aggregate hash over all files it matches
//! differs from the last one recorded for it. Hashes are kept in memory for
//! the lifetime of the watch session.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Result;
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut reader = fs.open_read(path)?;
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Deterministic hash over the names and contents of `paths`.
///
/// Order of `paths` does not matter. Renaming a file changes the hash.
pub fn compute_hash_for_paths(fs: &dyn FileSystem, paths: &[PathBuf]) -> Result<String> {
    let mut sorted: Vec<&PathBuf> = paths.iter().collect();
    sorted.sort();

    let mut hasher = Hasher::new();
    for path in sorted {
        if !fs.is_file(path) {
            continue;
        }
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(&[0]);
        hasher.update(compute_file_hash(fs, path)?.as_bytes());
    }

    let hash = hasher.finalize().to_hex().to_string();
    debug!(hash = %hash, files = paths.len(), "computed aggregate hash");
    Ok(hash)
}

/// Last known hash per binding.
pub trait HashStore: Send {
    fn load(&self, binding: usize) -> Option<&str>;
    fn save(&mut self, binding: usize, hash: String);
}

#[derive(Debug, Default)]
pub struct MemoryHashStore {
    map: HashMap<usize, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HashStore for MemoryHashStore {
    fn load(&self, binding: usize) -> Option<&str> {
        self.map.get(&binding).map(|s| s.as_str())
    }

    fn save(&mut self, binding: usize, hash: String) {
        debug!(binding, hash = %hash, "stored binding hash");
        self.map.insert(binding, hash);
    }
}

/// Record `hash` for `binding` and report whether it differs from the
/// previous one. The first hash seen for a binding counts as a change.
pub fn record_if_changed(store: &mut dyn HashStore, binding: usize, hash: String) -> bool {
    if store.load(binding) == Some(hash.as_str()) {
        return false;
    }
    store.save(binding, hash);
    true
}
