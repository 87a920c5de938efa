// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
struct MockFile {
    content: Vec<u8>,
    modified: SystemTime,
}

/// In-memory filesystem.
///
/// Only files are stored; directories exist implicitly as ancestors of
/// files. Every write advances a logical clock by one second so that
/// modification-time comparisons are deterministic.
#[derive(Debug, Clone)]
pub struct MockFileSystem {
    files: Arc<Mutex<BTreeMap<PathBuf, MockFile>>>,
    clock: Arc<Mutex<SystemTime>>,
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(BTreeMap::new())),
            clock: Arc::new(Mutex::new(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000))),
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let modified = self.tick();
        self.lock_files().insert(
            path.as_ref().to_path_buf(),
            MockFile {
                content: content.into(),
                modified,
            },
        );
    }

    /// Paths of every stored file, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock_files().keys().cloned().collect()
    }

    fn tick(&self) -> SystemTime {
        let mut clock = self.clock.lock().unwrap_or_else(|e| e.into_inner());
        *clock += Duration::from_secs(1);
        *clock
    }

    fn lock_files(&self) -> MutexGuard<'_, BTreeMap<PathBuf, MockFile>> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn get(&self, path: &Path) -> Result<MockFile> {
        self.lock_files()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("File not found: {:?}", path))
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(self.get(path)?.content)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        String::from_utf8(self.read(path)?).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.read(path)?)))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.lock_files().remove(path);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.lock_files().contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.lock_files()
            .keys()
            .any(|p| p != path && p.starts_with(path))
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        Ok(self.get(path)?.modified)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.lock_files();
        let mut children: Vec<PathBuf> = Vec::new();

        for p in files.keys() {
            let Ok(rest) = p.strip_prefix(path) else {
                continue;
            };
            if let Some(first) = rest.components().next() {
                let child = path.join(first);
                if !children.contains(&child) {
                    children.push(child);
                }
            }
        }

        if children.is_empty() {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        Ok(children)
    }
}
