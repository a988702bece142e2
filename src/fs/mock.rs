// src/fs/mock.rs

use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory filesystem for exercising the marker protocol without disk
/// I/O. Clones share state, so a test can keep a handle while the monitor
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    files: HashMap<PathBuf, Vec<u8>>,
    stuck: HashSet<PathBuf>,
    publishes: usize,
    removals: usize,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A poisoned lock only means another test thread panicked; the map
        // itself is still consistent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.state()
            .files
            .insert(path.as_ref().to_path_buf(), content.into());
    }

    /// Make every later `remove_file` on `path` fail, like a file on a
    /// read-only mount.
    pub fn make_undeletable(&self, path: impl AsRef<Path>) {
        self.state().stuck.insert(path.as_ref().to_path_buf());
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.state().files.get(path.as_ref()).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.state().files.len()
    }

    /// Number of successful `publish` calls.
    pub fn publish_count(&self) -> usize {
        self.state().publishes
    }

    /// Number of successful `remove_file` calls.
    pub fn removal_count(&self) -> usize {
        self.state().removals
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        match self.state().files.get(path) {
            Some(content) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        match self.state().files.get(path) {
            Some(content) => Ok(Box::new(Cursor::new(content.clone()))),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn publish(&self, path: &Path, contents: &[u8]) -> Result<()> {
        // Single insert under the lock: readers see all or nothing.
        let mut state = self.state();
        state.files.insert(path.to_path_buf(), contents.to_vec());
        state.publishes += 1;
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let mut state = self.state();
        if state.stuck.contains(path) {
            return Err(anyhow!("Permission denied: {:?}", path));
        }
        match state.files.remove(path) {
            Some(_) => {
                state.removals += 1;
                Ok(())
            }
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.state().files.contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.exists(path)
    }
}
