//! Artifact storage under the cache root
//!
//! [`CacheStore`] maps cache keys to root-relative locations and moves
//! artifact bytes through a [`StorageBackend`]. The index file lives next to
//! the artifacts and uses the binary layout in [`format`].

mod backend;
pub mod format;
mod paths;

pub use backend::{DiskBackend, StorageBackend};
pub use paths::{artifact_location, INDEX_FILE_NAME};

use crate::errors::Result;
use crate::keys::{ArtifactKind, CacheKey};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Key-addressed artifact I/O rooted at one directory.
///
/// Cheap to clone so artifact writes can run outside the manager's lock.
#[derive(Clone)]
pub struct CacheStore {
    root: PathBuf,
    backend: Arc<dyn StorageBackend>,
}

impl CacheStore {
    pub fn new(root: PathBuf, backend: Arc<dyn StorageBackend>) -> Self {
        Self { root, backend }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Root-relative location of an artifact
    pub fn location_for(&self, kind: ArtifactKind, key: &CacheKey) -> PathBuf {
        artifact_location(kind, key)
    }

    /// Absolute path of a root-relative location
    pub fn absolute(&self, location: &Path) -> PathBuf {
        self.root.join(location)
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE_NAME)
    }

    pub fn write_artifact(&self, location: &Path, bytes: &[u8]) -> Result<()> {
        self.backend.write_atomic(&self.absolute(location), bytes)
    }

    pub fn read_artifact(&self, location: &Path) -> Result<Vec<u8>> {
        self.backend.read(&self.absolute(location))
    }

    /// Delete an artifact; an already missing file counts as deleted
    pub fn remove_artifact(&self, location: &Path) -> Result<()> {
        self.backend.remove(&self.absolute(location))
    }

    /// Size on disk, `None` when the artifact is gone
    pub fn artifact_size(&self, location: &Path) -> Result<Option<u64>> {
        self.backend.size(&self.absolute(location))
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}
