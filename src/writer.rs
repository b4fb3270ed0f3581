//! Document output.
//!
//! Every node's document goes through a [`DocumentWriter`]. [`FsWriter`]
//! writes `index.json` files next to the content; [`MemoryWriter`] keeps
//! them in a map so `check` and tests can inspect output without touching
//! the tree.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Destination for serialized documents. Called concurrently.
pub trait DocumentWriter: Sync {
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;
}

/// Writes documents to the filesystem, overwriting existing files.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsWriter;

impl DocumentWriter for FsWriter {
    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        fs::write(path, contents)
    }
}

/// Collects documents in memory, keyed by path.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    documents: Mutex<BTreeMap<PathBuf, String>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<String> {
        self.lock().get(path).cloned()
    }

    /// Paths written so far, in sorted order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, String>> {
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DocumentWriter for MemoryWriter {
    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        self.lock().insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }
}
