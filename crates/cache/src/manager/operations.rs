//! Lookup/store protocol and maintenance operations

use super::CacheManager;
use crate::codec::ArtifactCodec;
use crate::errors::Result;
use crate::freshness::FreshnessToken;
use crate::index::CacheRecord;
use crate::keys::{CacheKey, SourceDescriptor};
use crate::storage::CacheStore;
use crate::types::{CachedArtifact, Lookup, SkipReason, StoreOutcome, VerifyReport};
use std::time::Instant;

impl CacheManager {
    /// Ask the cache for the derived artifact of `source`.
    ///
    /// A hit refreshes the record's access stamp without dirtying the index;
    /// the new stamp is persisted with the next flush.
    pub fn lookup(&self, source: &SourceDescriptor) -> Lookup {
        if !self.cache_enabled_for(source.kind) {
            self.stats.record_bypass();
            return Lookup::NotApplicable;
        }

        let key = self.fingerprint(source);
        let live = match self.probe.probe(&source.path) {
            Ok(token) => token,
            Err(e) => {
                tracing::debug!(key = %key, "Cannot probe source, bypassing cache: {e}");
                self.stats.record_bypass();
                return Lookup::NotApplicable;
            }
        };

        let hit = self.state.with(|s| {
            let record = s.index.get(&key)?;
            if record.freshness != live {
                return None;
            }
            let artifact = CachedArtifact {
                key: key.clone(),
                kind: record.kind,
                path: s.store.absolute(&record.location()),
                size: record.size,
            };
            s.index.touch(&key);
            Some(artifact)
        });

        match hit {
            Some(artifact) => {
                tracing::debug!(key = %key, size = artifact.size, "Artifact cache hit");
                self.stats.record_hit();
                Lookup::Hit(artifact)
            }
            None => {
                tracing::debug!(key = %key, kind = %source.kind, "Artifact cache miss");
                self.stats.record_miss();
                Lookup::Miss
            }
        }
    }

    /// Store the derived artifact of `source`.
    ///
    /// The bytes are written outside the lock while the key is marked in
    /// flight; the record is inserted afterwards and the size limit enforced.
    pub fn store(&self, source: &SourceDescriptor, bytes: &[u8]) -> StoreOutcome {
        let key = self.fingerprint(source);

        let store = self.state.with(|s| {
            if s.policy.read_only() {
                return Err(SkipReason::ReadOnly);
            }
            if !s.policy.cache_enabled_for(source.kind) {
                return Err(SkipReason::KindDisabled);
            }
            s.begin_store(&key);
            Ok(s.store.clone())
        });

        let outcome = match store {
            Ok(store) => {
                let outcome = self.write_and_record(source, &key, &store, bytes);
                self.state.with(|s| s.end_store(&key));
                outcome
            }
            Err(reason) => StoreOutcome::Skipped(reason),
        };

        match &outcome {
            StoreOutcome::Stored { size, .. } => {
                tracing::debug!(key = %key, size, "Stored artifact");
                self.stats.record_write();
            }
            StoreOutcome::Skipped(reason) => {
                tracing::debug!(key = %key, "Artifact not stored: {reason}");
                self.stats.record_skipped_write();
            }
        }
        outcome
    }

    fn write_and_record(
        &self,
        source: &SourceDescriptor,
        key: &CacheKey,
        store: &CacheStore,
        bytes: &[u8],
    ) -> StoreOutcome {
        let freshness = match self.probe.probe(&source.path) {
            Ok(token) => token,
            Err(e) => {
                tracing::debug!(key = %key, "Cannot probe source: {e}");
                return StoreOutcome::Skipped(SkipReason::SourceUnavailable);
            }
        };

        let location = store.location_for(source.kind, key);
        if let Err(e) = store.write_artifact(&location, bytes) {
            if e.is_permission_denied() {
                self.enter_read_only(&e);
            } else {
                tracing::warn!(key = %key, "Failed to write artifact: {e}");
            }
            return StoreOutcome::Skipped(SkipReason::WriteFailed);
        }

        let size = bytes.len() as u64;
        if !self.record_stored(source, key, store, size, freshness) {
            if let Err(e) = store.remove_artifact(&location) {
                tracing::debug!(key = %key, "Could not remove orphaned artifact: {e}");
            }
            return StoreOutcome::Skipped(SkipReason::RootChanged);
        }

        self.check_eviction();
        StoreOutcome::Stored {
            key: key.clone(),
            size,
        }
    }

    /// Insert the record unless the root moved while the bytes were written
    fn record_stored(
        &self,
        source: &SourceDescriptor,
        key: &CacheKey,
        store: &CacheStore,
        size: u64,
        freshness: FreshnessToken,
    ) -> bool {
        self.state.with(|s| {
            if s.store.root() != store.root() {
                return false;
            }
            let last_access = s.index.next_access_stamp();
            s.index.insert(CacheRecord {
                key: key.clone(),
                kind: source.kind,
                size,
                freshness,
                last_access,
            });
            s.index.mark_stale(Instant::now());
            true
        })
    }

    /// Drop the record of `source` and its artifact
    pub fn invalidate(&self, source: &SourceDescriptor) -> bool {
        self.invalidate_key(&self.fingerprint(source))
    }

    /// Drop a record and its artifact. In read-only mode only the in-memory
    /// record goes away.
    pub fn invalidate_key(&self, key: &CacheKey) -> bool {
        let removed = self.state.with(|s| {
            let record = s.index.remove(key)?;
            s.index.mark_stale(Instant::now());
            if !s.policy.read_only() {
                if let Err(e) = s.store.remove_artifact(&record.location()) {
                    tracing::warn!(key = %key, "Failed to delete invalidated artifact: {e}");
                }
            }
            Some(record)
        });

        if removed.is_some() {
            tracing::debug!(key = %key, "Invalidated artifact");
        }
        removed.is_some()
    }

    /// Remove every record; returns how many were dropped
    pub fn clear(&self) -> usize {
        let removed = self.state.with(|s| {
            let read_only = s.policy.read_only();
            let records = s.index.snapshot();
            for record in &records {
                s.index.remove(&record.key);
                if read_only {
                    continue;
                }
                if let Err(e) = s.store.remove_artifact(&record.location()) {
                    tracing::warn!(key = %record.key, "Failed to delete artifact: {e}");
                }
            }
            if !records.is_empty() {
                s.index.mark_stale(Instant::now());
            }
            records.len()
        });

        tracing::info!(removed, "Cleared artifact cache");
        removed
    }

    /// Read the bytes of a hit
    pub fn read_artifact(&self, artifact: &CachedArtifact) -> Result<Vec<u8>> {
        self.backend.read(&artifact.path)
    }

    /// Return the cached artifact of `source`, or compute and cache it.
    ///
    /// A hit whose bytes are gone or fail to decode is invalidated and
    /// recomputed. The computed artifact is returned even when storing it is
    /// skipped.
    pub fn load_or_compute<C, F, E>(
        &self,
        source: &SourceDescriptor,
        codec: &C,
        compute: F,
    ) -> std::result::Result<C::Artifact, E>
    where
        C: ArtifactCodec,
        F: FnOnce() -> std::result::Result<C::Artifact, E>,
    {
        let cacheable = match self.lookup(source) {
            Lookup::Hit(cached) => {
                match self
                    .read_artifact(&cached)
                    .and_then(|bytes| codec.decode(&bytes))
                {
                    Ok(artifact) => return Ok(artifact),
                    Err(e) => {
                        tracing::warn!(key = %cached.key, "Dropping unusable cached artifact: {e}");
                        self.invalidate_key(&cached.key);
                        true
                    }
                }
            }
            Lookup::Miss => true,
            Lookup::NotApplicable => false,
        };

        let artifact = compute()?;
        if cacheable {
            match codec.encode(&artifact) {
                Ok(bytes) => {
                    self.store(source, &bytes);
                }
                Err(e) => tracing::warn!(kind = %source.kind, "Cannot encode artifact: {e}"),
            }
        }
        Ok(artifact)
    }

    /// Re-check every record against the disk, dropping records whose
    /// artifact vanished and correcting sizes
    pub fn verify(&self) -> VerifyReport {
        let report = self.state.with(|s| {
            let mut report = VerifyReport::default();
            for record in s.index.snapshot() {
                report.checked += 1;
                match s.store.artifact_size(&record.location()) {
                    Ok(Some(size)) => {
                        if s.index.resize(&record.key, size) {
                            report.resized.push(record.key);
                        }
                    }
                    Ok(None) => {
                        s.index.remove(&record.key);
                        report.missing.push(record.key);
                    }
                    Err(e) => {
                        tracing::debug!(key = %record.key, "Cannot check artifact: {e}");
                        report.errors += 1;
                    }
                }
            }
            if !report.missing.is_empty() || !report.resized.is_empty() {
                s.index.mark_stale(Instant::now());
            }
            report
        });

        tracing::info!(
            checked = report.checked,
            missing = report.missing.len(),
            resized = report.resized.len(),
            "Verified artifact cache index"
        );
        report
    }

    /// All records, least recently used first
    pub fn entries(&self) -> Vec<CacheRecord> {
        self.state.with(|s| s.index.snapshot())
    }
}
