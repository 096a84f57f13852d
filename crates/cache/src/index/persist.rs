//! Loading and persisting the index file

use super::{CacheIndex, CacheRecord};
use crate::errors::Result;
use crate::storage::{format, CacheStore};
use serde::{Deserialize, Serialize};

/// On-disk payload behind the index header
#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    records: Vec<CacheRecord>,
}

/// Read the records of the index under the store's root.
///
/// `Ok(None)` when no index exists yet.
pub fn read_index_records(store: &CacheStore) -> Result<Option<Vec<CacheRecord>>> {
    let path = store.index_path();
    if !store.backend().exists(&path) {
        return Ok(None);
    }

    let bytes = store.backend().read(&path)?;
    let file: IndexFile = format::decode(&bytes)?;
    Ok(Some(file.records))
}

/// Load the index, falling back to an empty one on any failure
pub fn load_index(store: &CacheStore) -> CacheIndex {
    match read_index_records(store) {
        Ok(Some(records)) => {
            let index = CacheIndex::from_records(records);
            tracing::info!(
                root = %store.root().display(),
                entries = index.len(),
                bytes = index.total_size(),
                "Loaded artifact cache index"
            );
            index
        }
        Ok(None) => {
            tracing::debug!(
                root = %store.root().display(),
                "No artifact cache index found, starting cold"
            );
            CacheIndex::new()
        }
        Err(e) => {
            tracing::warn!(
                root = %store.root().display(),
                "Ignoring unreadable artifact cache index, starting cold: {e}"
            );
            CacheIndex::new()
        }
    }
}

/// Serialize the index and atomically replace the file on disk
pub fn write_index(store: &CacheStore, index: &CacheIndex) -> Result<()> {
    let file = IndexFile {
        records: index.snapshot(),
    };
    let bytes = format::encode(&file)?;
    store.backend().write_atomic(&store.index_path(), &bytes)
}
