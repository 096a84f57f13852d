//! Test doubles shared by unit tests

use crate::errors::{CacheError, RecoveryHint, Result};
use crate::storage::{DiskBackend, StorageBackend, INDEX_FILE_NAME};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Disk backend with switchable permission failures
#[derive(Default)]
pub struct FaultyBackend {
    inner: DiskBackend,
    deny_writes: AtomicBool,
    /// File-name fragments whose removal fails
    deny_removes: Mutex<HashSet<String>>,
    index_writes: AtomicUsize,
}

impl FaultyBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny_writes(&self, deny: bool) {
        self.deny_writes.store(deny, Ordering::SeqCst);
    }

    pub fn deny_remove_of(&self, fragment: &str) {
        self.deny_removes.lock().insert(fragment.to_string());
    }

    pub fn allow_removes(&self) {
        self.deny_removes.lock().clear();
    }

    /// Number of successful index file writes
    pub fn index_writes(&self) -> usize {
        self.index_writes.load(Ordering::SeqCst)
    }
}

fn denied(path: &Path, operation: &'static str) -> CacheError {
    CacheError::Io {
        path: path.to_path_buf(),
        operation,
        source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        recovery_hint: RecoveryHint::CheckPermissions {
            path: path.to_path_buf(),
        },
    }
}

impl StorageBackend for FaultyBackend {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.inner.read(path)
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if self.deny_writes.load(Ordering::SeqCst) {
            return Err(denied(path, "write cache file"));
        }
        self.inner.write_atomic(path, bytes)?;
        if path.file_name().is_some_and(|name| name == INDEX_FILE_NAME) {
            self.index_writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let name = path.to_string_lossy();
        if self
            .deny_removes
            .lock()
            .iter()
            .any(|fragment| name.contains(fragment.as_str()))
        {
            return Err(denied(path, "remove cache file"));
        }
        self.inner.remove(path)
    }

    fn size(&self, path: &Path) -> Result<Option<u64>> {
        self.inner.size(path)
    }
}
