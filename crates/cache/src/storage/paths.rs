//! Layout of the cache root

use crate::keys::{ArtifactKind, CacheKey};
use std::path::PathBuf;

/// Index file name, directly under the root
pub const INDEX_FILE_NAME: &str = "index.bin";

const ARTIFACT_EXTENSION: &str = "artifact";

/// `<kind-dir>/<first two key chars>/<key>.artifact`
///
/// The two-character shard keeps directory sizes manageable for big caches.
pub fn artifact_location(kind: ArtifactKind, key: &CacheKey) -> PathBuf {
    let key = key.as_str();
    let shard = &key[..2];
    PathBuf::from(kind.dir_name())
        .join(shard)
        .join(format!("{key}.{ARTIFACT_EXTENSION}"))
}
