//! In-memory index of cached artifacts
//!
//! The aggregate size is maintained on every insert/remove and never
//! recomputed by scanning. `stale_since` records the first modification
//! after the last successful flush and is only cleared by the next one.

mod persist;

pub use persist::{load_index, read_index_records, write_index};

use crate::freshness::FreshnessToken;
use crate::keys::{ArtifactKind, CacheKey};
use crate::storage::artifact_location;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// One cached artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub key: CacheKey,
    pub kind: ArtifactKind,
    /// Artifact size in bytes
    pub size: u64,
    /// Token of the source the artifact was derived from
    pub freshness: FreshnessToken,
    /// Access stamp: Unix milliseconds, strictly increasing within one index
    pub last_access: u64,
}

impl CacheRecord {
    /// Root-relative artifact location; derived from kind and key so no two
    /// records can share storage
    pub fn location(&self) -> PathBuf {
        artifact_location(self.kind, &self.key)
    }
}

/// Records keyed by fingerprint plus bookkeeping
#[derive(Debug, Default)]
pub struct CacheIndex {
    records: HashMap<CacheKey, CacheRecord>,
    total_size: u64,
    stale_since: Option<Instant>,
    last_stamp: u64,
    /// Keys removed locally since the last flush; foreign copies of these are
    /// not re-adopted when merging with the on-disk index
    removed_since_flush: HashSet<CacheKey>,
}

impl CacheIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from persisted records; duplicate keys keep the most recent access.
    /// Stamps from the future (another writer's skewed clock) are clamped to now.
    pub fn from_records(records: impl IntoIterator<Item = CacheRecord>) -> Self {
        let mut index = Self::new();
        let now = now_millis();
        for mut record in records {
            record.last_access = record.last_access.min(now);
            let keep = index
                .records
                .get(&record.key)
                .map_or(true, |existing| existing.last_access < record.last_access);
            if keep {
                index.insert(record);
            }
        }
        index.removed_since_flush.clear();
        index
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Aggregate size of all records in bytes
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn get(&self, key: &CacheKey) -> Option<&CacheRecord> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn records(&self) -> impl Iterator<Item = &CacheRecord> {
        self.records.values()
    }

    /// Insert or replace a record, returning the replaced one
    pub fn insert(&mut self, record: CacheRecord) -> Option<CacheRecord> {
        self.last_stamp = self.last_stamp.max(record.last_access);
        self.removed_since_flush.remove(&record.key);
        self.total_size = self.total_size.saturating_add(record.size);

        let replaced = self.records.insert(record.key.clone(), record);
        if let Some(old) = &replaced {
            self.total_size = self.total_size.saturating_sub(old.size);
        }
        replaced
    }

    pub fn remove(&mut self, key: &CacheKey) -> Option<CacheRecord> {
        let removed = self.records.remove(key)?;
        self.total_size = self.total_size.saturating_sub(removed.size);
        self.removed_since_flush.insert(key.clone());
        Some(removed)
    }

    /// Correct a record's size after re-checking the disk
    pub fn resize(&mut self, key: &CacheKey, size: u64) -> bool {
        match self.records.get_mut(key) {
            Some(record) if record.size != size => {
                self.total_size = self.total_size.saturating_sub(record.size) + size;
                record.size = size;
                true
            }
            _ => false,
        }
    }

    /// Bump a record's access stamp; returns the new stamp
    pub fn touch(&mut self, key: &CacheKey) -> Option<u64> {
        if !self.records.contains_key(key) {
            return None;
        }
        let stamp = self.next_access_stamp();
        let record = self.records.get_mut(key)?;
        record.last_access = stamp;
        Some(stamp)
    }

    /// Next access stamp: wall-clock milliseconds, but never equal to or
    /// below a stamp already handed out
    pub fn next_access_stamp(&mut self) -> u64 {
        self.last_stamp = now_millis().max(self.last_stamp.saturating_add(1));
        self.last_stamp
    }

    pub fn stale_since(&self) -> Option<Instant> {
        self.stale_since
    }

    pub fn is_stale(&self) -> bool {
        self.stale_since.is_some()
    }

    /// Record the first modification since the last flush. Later calls keep
    /// the original instant so staleness stays bounded under constant writes.
    pub fn mark_stale(&mut self, now: Instant) -> bool {
        if self.stale_since.is_some() {
            return false;
        }
        self.stale_since = Some(now);
        true
    }

    /// Reset after a successful flush
    pub fn mark_flushed(&mut self) {
        self.stale_since = None;
        self.removed_since_flush.clear();
    }

    pub fn was_removed_since_flush(&self, key: &CacheKey) -> bool {
        self.removed_since_flush.contains(key)
    }

    /// Records ordered by access stamp, oldest first, ties by key
    pub fn snapshot(&self) -> Vec<CacheRecord> {
        let mut records: Vec<_> = self.records.values().cloned().collect();
        records.sort_by(|a, b| (a.last_access, &a.key).cmp(&(b.last_access, &b.key)));
        records
    }

    /// Adopt records written by other processes that this index does not know.
    ///
    /// Records this process removed since its last flush stay removed, and
    /// foreign records are only taken when `artifact_exists` confirms their
    /// file is still on disk. Returns the number of adopted records.
    pub fn merge_foreign<F>(&mut self, foreign: Vec<CacheRecord>, artifact_exists: F) -> usize
    where
        F: Fn(&CacheRecord) -> bool,
    {
        let mut adopted = 0;
        let now = now_millis();
        for mut record in foreign {
            record.last_access = record.last_access.min(now);
            if self.records.contains_key(&record.key)
                || self.removed_since_flush.contains(&record.key)
                || !artifact_exists(&record)
            {
                continue;
            }
            self.insert(record);
            adopted += 1;
        }
        adopted
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests;
