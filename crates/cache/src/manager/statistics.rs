//! Cache statistics tracking and reporting

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Counters for cache operations since the manager was created
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStatistics {
    pub hits: u64,
    pub misses: u64,
    /// Lookups answered with "not applicable" (kind disabled or inactive)
    pub bypassed: u64,
    pub writes: u64,
    pub skipped_writes: u64,
    pub evictions: u64,
    pub evicted_bytes: u64,
    pub flushes: u64,
    pub failed_flushes: u64,
    pub last_flush: Option<SystemTime>,
}

impl CacheStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate hit rate as a percentage of hits and misses
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Get total lookups, including bypassed ones
    pub fn total_lookups(&self) -> u64 {
        self.hits + self.misses + self.bypassed
    }
}

/// Thread-safe statistics container
#[derive(Debug, Default)]
pub struct StatsContainer {
    stats: RwLock<CacheStatistics>,
}

impl StatsContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.stats.write().hits += 1;
    }

    pub fn record_miss(&self) {
        self.stats.write().misses += 1;
    }

    pub fn record_bypass(&self) {
        self.stats.write().bypassed += 1;
    }

    pub fn record_write(&self) {
        self.stats.write().writes += 1;
    }

    pub fn record_skipped_write(&self) {
        self.stats.write().skipped_writes += 1;
    }

    pub fn record_evictions(&self, count: usize, bytes: u64) {
        let mut stats = self.stats.write();
        stats.evictions += count as u64;
        stats.evicted_bytes += bytes;
    }

    pub fn record_flush(&self) {
        let mut stats = self.stats.write();
        stats.flushes += 1;
        stats.last_flush = Some(SystemTime::now());
    }

    pub fn record_failed_flush(&self) {
        self.stats.write().failed_flushes += 1;
    }

    pub fn snapshot(&self) -> CacheStatistics {
        self.stats.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = CacheStatistics {
            hits: 2,
            misses: 1,
            bypassed: 5,
            ..CacheStatistics::default()
        };

        assert_eq!(stats.hit_rate(), 66.66666666666666);
        assert_eq!(stats.total_lookups(), 8);
        assert_eq!(CacheStatistics::new().hit_rate(), 0.0);
    }

    #[test]
    fn test_stats_container() {
        let container = StatsContainer::new();

        container.record_hit();
        container.record_miss();
        container.record_write();
        container.record_evictions(2, 300);
        container.record_flush();

        let snapshot = container.snapshot();
        assert_eq!(snapshot.hits, 1);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.writes, 1);
        assert_eq!(snapshot.evictions, 2);
        assert_eq!(snapshot.evicted_bytes, 300);
        assert_eq!(snapshot.flushes, 1);
        assert!(snapshot.last_flush.is_some());
    }
}
