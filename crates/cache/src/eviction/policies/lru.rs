//! LRU (Least Recently Used) eviction policy implementation

use crate::eviction::traits::EvictionPolicy;
use crate::index::CacheIndex;
use crate::keys::CacheKey;

/// Evicts the record with the oldest access stamp first; ties go to the
/// smaller key so the order is deterministic
#[derive(Debug, Clone, Copy, Default)]
pub struct LruPolicy;

impl LruPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl EvictionPolicy for LruPolicy {
    fn name(&self) -> &'static str {
        "lru"
    }

    fn candidates(
        &self,
        index: &CacheIndex,
        excluded: &dyn Fn(&CacheKey) -> bool,
    ) -> Vec<CacheKey> {
        let mut order: Vec<(u64, &CacheKey)> = index
            .records()
            .filter(|record| !excluded(&record.key))
            .map(|record| (record.last_access, &record.key))
            .collect();

        order.sort_unstable();
        order.into_iter().map(|(_, key)| key.clone()).collect()
    }
}
