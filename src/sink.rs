//! Output sinks for rendered files

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{GenError, Result};

/// Where rendered files go
pub trait OutputSink {
    fn ensure_dir(&self, path: &Path) -> Result<()>;

    fn write_file(&self, path: &Path, content: &str) -> Result<()>;
}

/// Writes to the filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSink;

impl OutputSink for FsSink {
    fn ensure_dir(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|e| GenError::io(path, e))
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        fs::write(path, content).map_err(|e| GenError::io(path, e))
    }
}

/// Keeps rendered files in memory; clones share the same files
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    files: Arc<Mutex<BTreeMap<PathBuf, String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Written files, sorted by path
    pub fn files(&self) -> BTreeMap<PathBuf, String> {
        self.files.lock().map(|f| f.clone()).unwrap_or_default()
    }

    pub fn get(&self, path: &Path) -> Option<String> {
        self.files.lock().ok()?.get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.files.lock().map(|f| f.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OutputSink for MemorySink {
    fn ensure_dir(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        let mut files = self
            .files
            .lock()
            .map_err(|_| GenError::Config("memory sink poisoned".to_string()))?;
        files.insert(path.to_path_buf(), content.to_string());
        Ok(())
    }
}
