//! Raw filesystem access behind a trait so tests can inject failures

use crate::errors::{CacheError, RecoveryHint, Result};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// Byte-level storage primitives used by the cache
pub trait StorageBackend: Send + Sync {
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write via a temporary sibling and rename, so readers never see a
    /// partially written file
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    /// Remove a file; `Ok` when it does not exist
    fn remove(&self, path: &Path) -> Result<()>;

    /// Current size, `None` when the file does not exist
    fn size(&self, path: &Path) -> Result<Option<u64>>;

    fn exists(&self, path: &Path) -> bool {
        matches!(self.size(path), Ok(Some(_)))
    }
}

/// [`StorageBackend`] on the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskBackend;

impl StorageBackend for DiskBackend {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| io_error(path, "read cache file", e))
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let parent = path.parent().ok_or_else(|| CacheError::Configuration {
            message: format!("Invalid cache path without parent: {}", path.display()),
            recovery_hint: RecoveryHint::NoRecovery,
        })?;
        fs::create_dir_all(parent).map_err(|e| io_error(parent, "create parent directory", e))?;

        let mut staged = StagedFile::create(parent)?;
        staged.fill(bytes)?;
        staged.commit(path)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(path, "remove cache file", e)),
        }
    }

    fn size(&self, path: &Path) -> Result<Option<u64>> {
        match fs::metadata(path) {
            Ok(metadata) => Ok(Some(metadata.len())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(path, "stat cache file", e)),
        }
    }
}

/// Hidden sibling of the target; removed on drop unless committed
struct StagedFile {
    path: PathBuf,
    file: File,
    committed: bool,
}

impl StagedFile {
    fn create(dir: &Path) -> Result<Self> {
        let path = dir.join(format!(".{}.tmp", Uuid::new_v4()));
        let file =
            File::create(&path).map_err(|e| io_error(&path, "create temporary file", e))?;
        Ok(Self {
            path,
            file,
            committed: false,
        })
    }

    /// Write the payload and flush it to stable storage
    fn fill(&mut self, bytes: &[u8]) -> Result<()> {
        self.file
            .write_all(bytes)
            .and_then(|()| self.file.sync_all())
            .map_err(|e| io_error(&self.path, "write temporary file", e))
    }

    /// Rename over the target; same directory, so the rename is atomic
    fn commit(mut self, target: &Path) -> Result<()> {
        fs::rename(&self.path, target).map_err(|e| io_error(target, "atomic rename", e))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

fn io_error(path: &Path, operation: &'static str, source: std::io::Error) -> CacheError {
    let recovery_hint = match source.kind() {
        ErrorKind::PermissionDenied => RecoveryHint::CheckPermissions {
            path: path.to_path_buf(),
        },
        ErrorKind::Interrupted | ErrorKind::WouldBlock => RecoveryHint::Retry {
            after: Duration::from_millis(10),
        },
        _ => RecoveryHint::LoadUncached,
    };

    CacheError::Io {
        path: path.to_path_buf(),
        operation,
        source,
        recovery_hint,
    }
}
