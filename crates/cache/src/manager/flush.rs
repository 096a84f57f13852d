//! Index staleness, flush scheduling and eviction checks

use super::CacheManager;
use crate::errors::CacheError;
use crate::eviction::{evict_to_limit, EvictionReport};
use crate::index::{read_index_records, write_index};
use std::time::Instant;

enum FlushAttempt {
    ReadOnly,
    Written { entries: usize, bytes: u64, adopted: usize },
    Failed(CacheError),
}

impl CacheManager {
    /// Note that the in-memory index diverged from disk. Only the first call
    /// after a flush sets the timestamp.
    pub fn mark_index_stale(&self) -> bool {
        self.state.with(|s| s.index.mark_stale(Instant::now()))
    }

    /// When the index first became dirty, `None` if clean
    pub fn stale_since(&self) -> Option<Instant> {
        self.state.with(|s| s.index.stale_since())
    }

    /// Flush if the index has been dirty for at least the flush interval.
    ///
    /// Cheap when nothing is due; meant to be called once per frame or tick.
    pub fn consider_flush_index(&self) -> bool {
        self.consider_flush_at(Instant::now())
    }

    pub(crate) fn consider_flush_at(&self, now: Instant) -> bool {
        let region = self.state.enter();
        let due = region.with(|s| match s.index.stale_since() {
            Some(since) => now.saturating_duration_since(since) >= s.policy.flush_interval(),
            None => false,
        });

        due && self.flush_index()
    }

    /// Write the index to disk now.
    ///
    /// Records other processes added to the on-disk index are adopted first.
    /// A failed write switches the cache to read-only and keeps the index
    /// dirty so a later flush can retry; no error reaches the caller.
    pub fn flush_index(&self) -> bool {
        let attempt = self.state.with(|s| {
            if s.policy.read_only() {
                return FlushAttempt::ReadOnly;
            }

            let adopted = match read_index_records(&s.store) {
                Ok(Some(foreign)) => {
                    let store = &s.store;
                    s.index.merge_foreign(foreign, |record| {
                        store.backend().exists(&store.absolute(&record.location()))
                    })
                }
                Ok(None) => 0,
                Err(e) => {
                    tracing::debug!("Replacing unreadable on-disk index: {e}");
                    0
                }
            };

            match write_index(&s.store, &s.index) {
                Ok(()) => {
                    s.index.mark_flushed();
                    FlushAttempt::Written {
                        entries: s.index.len(),
                        bytes: s.index.total_size(),
                        adopted,
                    }
                }
                Err(e) => {
                    s.policy.set_read_only(true);
                    FlushAttempt::Failed(e)
                }
            }
        });

        match attempt {
            FlushAttempt::ReadOnly => {
                tracing::debug!("Skipping index flush, cache is read-only");
                false
            }
            FlushAttempt::Written {
                entries,
                bytes,
                adopted,
            } => {
                self.stats.record_flush();
                tracing::info!(entries, bytes, adopted, "Flushed artifact cache index");
                true
            }
            FlushAttempt::Failed(e) => {
                self.stats.record_failed_flush();
                tracing::warn!("Index flush failed, artifact cache is now read-only: {e}");
                false
            }
        }
    }

    /// Enforce the size limit.
    ///
    /// Keys with a store in progress are never evicted. Evicting dirties the
    /// index and gives the flush scheduler a chance to run.
    pub fn check_eviction(&self) -> EvictionReport {
        let region = self.state.enter();
        let report = region.with(|s| {
            if s.policy.read_only() {
                return EvictionReport::default();
            }

            let limit = s.policy.max_size_bytes();
            let in_flight = &s.in_flight;
            let report = evict_to_limit(
                &mut s.index,
                &s.store,
                self.eviction.as_ref(),
                limit,
                &|key| in_flight.contains_key(key),
            );

            if !report.evicted.is_empty() {
                s.index.mark_stale(Instant::now());
            }
            report
        });

        if !report.evicted.is_empty() {
            self.stats
                .record_evictions(report.evicted.len(), report.freed_bytes);
            tracing::info!(
                evicted = report.evicted.len(),
                freed_bytes = report.freed_bytes,
                "Evicted artifacts to stay within the size limit"
            );
            self.consider_flush_index();
        }

        report
    }

    /// Final flush before the manager goes away
    pub fn shutdown(&self) -> bool {
        let region = self.state.enter();
        if region.with(|s| s.index.is_stale()) {
            return self.flush_index();
        }
        true
    }
}
