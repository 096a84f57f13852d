//! Shared helpers for artifact cache integration tests

#![allow(dead_code)]

use artifact_cache::{
    ArtifactKind, CacheError, CacheManager, DiskBackend, RecoveryHint, Result, SourceDescriptor,
    StorageBackend,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

pub const KB: usize = 1024;

/// Source asset files for one test
pub struct Sources {
    dir: TempDir,
}

impl Sources {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Write a source file and describe it
    pub fn add(&self, name: &str, kind: ArtifactKind) -> SourceDescriptor {
        let path = self.dir.path().join(name);
        std::fs::write(&path, name.as_bytes()).unwrap();
        SourceDescriptor::new(path, kind)
    }
}

pub fn manager_at(root: &Path, max_size_kb: u64) -> CacheManager {
    CacheManager::builder()
        .with_root(root)
        .with_max_size_kb(max_size_kb)
        .build()
}

/// Disk backend whose writes can be made to fail like a read-only mount
#[derive(Default)]
pub struct LockableBackend {
    inner: DiskBackend,
    locked: AtomicBool,
}

impl LockableBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lock(&self) {
        self.locked.store(true, Ordering::SeqCst);
    }

    pub fn unlock(&self) {
        self.locked.store(false, Ordering::SeqCst);
    }
}

impl StorageBackend for LockableBackend {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.inner.read(path)
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if self.locked.load(Ordering::SeqCst) {
            return Err(CacheError::PermissionDenied {
                path: path.to_path_buf(),
                operation: "write cache file",
                recovery_hint: RecoveryHint::CheckPermissions {
                    path: path.to_path_buf(),
                },
            });
        }
        self.inner.write_atomic(path, bytes)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        self.inner.remove(path)
    }

    fn size(&self, path: &Path) -> Result<Option<u64>> {
        self.inner.size(path)
    }
}
