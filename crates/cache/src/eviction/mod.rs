//! Size-bound eviction
//!
//! [`evict_to_limit`] removes records in the order the policy dictates until
//! the aggregate size fits the limit. Records whose artifact cannot be
//! deleted are skipped and stay counted until a later pass succeeds.

mod policies;
mod traits;

pub use policies::LruPolicy;
pub use traits::EvictionPolicy;

use crate::index::CacheIndex;
use crate::keys::CacheKey;
use crate::storage::CacheStore;

/// Outcome of one eviction pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Removed records, in eviction order
    pub evicted: Vec<CacheKey>,
    pub freed_bytes: u64,
    /// Candidates whose artifact could not be deleted
    pub failed: Vec<CacheKey>,
}

impl EvictionReport {
    pub fn is_empty(&self) -> bool {
        self.evicted.is_empty() && self.failed.is_empty()
    }
}

/// Evict until `index.total_size() <= limit_bytes` or candidates run out
pub fn evict_to_limit(
    index: &mut CacheIndex,
    store: &CacheStore,
    policy: &dyn EvictionPolicy,
    limit_bytes: u64,
    excluded: &dyn Fn(&CacheKey) -> bool,
) -> EvictionReport {
    let mut report = EvictionReport::default();
    if index.total_size() <= limit_bytes {
        return report;
    }

    for key in policy.candidates(index, excluded) {
        if index.total_size() <= limit_bytes {
            break;
        }

        let Some(record) = index.get(&key) else {
            continue;
        };
        let location = record.location();
        let size = record.size;

        match store.remove_artifact(&location) {
            Ok(()) => {
                index.remove(&key);
                tracing::debug!(key = %key, size, "Evicted artifact");
                report.freed_bytes += size;
                report.evicted.push(key);
            }
            Err(e) => {
                tracing::warn!(key = %key, "Could not evict artifact, skipping: {e}");
                report.failed.push(key);
            }
        }
    }

    if index.total_size() > limit_bytes {
        tracing::debug!(
            policy = policy.name(),
            total = index.total_size(),
            limit = limit_bytes,
            "Cache still over budget after eviction pass"
        );
    }

    report
}

#[cfg(test)]
mod tests;
