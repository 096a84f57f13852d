//! Core eviction policy trait definition

use crate::index::CacheIndex;
use crate::keys::CacheKey;

/// Chooses which records to give up when the cache is over budget
pub trait EvictionPolicy: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Eviction candidates, first to go first. Keys for which `excluded`
    /// returns true must not be listed.
    fn candidates(&self, index: &CacheIndex, excluded: &dyn Fn(&CacheKey) -> bool)
        -> Vec<CacheKey>;
}
