//! Artifact cache manager
//!
//! Owns the policy, the index and the store behind one reentrant guard and
//! exposes the lookup/store protocol, runtime reconfiguration and the flush
//! scheduler.

mod builder;
mod flush;
mod operations;
mod statistics;

pub use builder::CacheManagerBuilder;
pub use statistics::{CacheStatistics, StatsContainer};

use crate::config::PolicyConfig;
use crate::errors::{CacheError, Result};
use crate::eviction::EvictionPolicy;
use crate::freshness::FreshnessProbe;
use crate::guard::ConcurrencyGuard;
use crate::index::{load_index, CacheIndex};
use crate::keys::{ArtifactKind, CacheKey, Fingerprinter, SourceDescriptor};
use crate::policy::PolicyState;
use crate::storage::{CacheStore, StorageBackend};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything behind the guard
pub(crate) struct CacheState {
    policy: PolicyState,
    index: CacheIndex,
    store: CacheStore,
    /// Keys whose artifact is being written, with the number of writers
    in_flight: HashMap<CacheKey, usize>,
}

impl CacheState {
    fn begin_store(&mut self, key: &CacheKey) {
        *self.in_flight.entry(key.clone()).or_insert(0) += 1;
    }

    fn end_store(&mut self, key: &CacheKey) {
        if let Some(writers) = self.in_flight.get_mut(key) {
            *writers -= 1;
            if *writers == 0 {
                self.in_flight.remove(key);
            }
        }
    }
}

/// Disk-backed cache of derived artifacts
pub struct CacheManager {
    state: ConcurrencyGuard<CacheState>,
    backend: Arc<dyn StorageBackend>,
    fingerprinter: Box<dyn Fingerprinter>,
    probe: Box<dyn FreshnessProbe>,
    eviction: Box<dyn EvictionPolicy>,
    stats: StatsContainer,
}

impl CacheManager {
    /// Create a manager with default collaborators, loading the index under
    /// the configured root
    pub fn new(config: PolicyConfig) -> Self {
        CacheManagerBuilder::new().with_config(config).build()
    }

    pub fn builder() -> CacheManagerBuilder {
        CacheManagerBuilder::new()
    }

    fn from_parts(
        config: PolicyConfig,
        backend: Arc<dyn StorageBackend>,
        fingerprinter: Box<dyn Fingerprinter>,
        probe: Box<dyn FreshnessProbe>,
        eviction: Box<dyn EvictionPolicy>,
    ) -> Self {
        let store = CacheStore::new(config.root_path.clone(), Arc::clone(&backend));
        let index = load_index(&store);

        Self {
            state: ConcurrencyGuard::new(CacheState {
                policy: config.into(),
                index,
                store,
                in_flight: HashMap::new(),
            }),
            backend,
            fingerprinter,
            probe,
            eviction,
            stats: StatsContainer::new(),
        }
    }

    /// Compute the cache key of a source descriptor
    pub fn fingerprint(&self, source: &SourceDescriptor) -> CacheKey {
        self.fingerprinter.fingerprint(source)
    }

    /// Snapshot of the current policy
    pub fn policy(&self) -> PolicyState {
        self.state.with(|s| s.policy.clone())
    }

    pub fn active(&self) -> bool {
        self.state.with(|s| s.policy.active())
    }

    pub fn cache_models(&self) -> bool {
        self.state.with(|s| s.policy.cache_models())
    }

    pub fn cache_textures(&self) -> bool {
        self.state.with(|s| s.policy.cache_textures())
    }

    pub fn cache_compressed_textures(&self) -> bool {
        self.state.with(|s| s.policy.cache_compressed_textures())
    }

    pub fn cache_compiled_shaders(&self) -> bool {
        self.state.with(|s| s.policy.cache_compiled_shaders())
    }

    pub fn cache_enabled_for(&self, kind: ArtifactKind) -> bool {
        self.state.with(|s| s.policy.cache_enabled_for(kind))
    }

    pub fn max_size_kb(&self) -> u64 {
        self.state.with(|s| s.policy.max_size_kb())
    }

    pub fn flush_interval_secs(&self) -> u64 {
        self.state.with(|s| s.policy.flush_interval_secs())
    }

    pub fn root_path(&self) -> PathBuf {
        self.state.with(|s| s.policy.root_path().to_path_buf())
    }

    pub fn read_only(&self) -> bool {
        self.state.with(|s| s.policy.read_only())
    }

    pub fn entry_count(&self) -> usize {
        self.state.with(|s| s.index.len())
    }

    /// Aggregate size of all indexed artifacts in bytes
    pub fn total_size_bytes(&self) -> u64 {
        self.state.with(|s| s.index.total_size())
    }

    pub fn statistics(&self) -> CacheStatistics {
        self.stats.snapshot()
    }

    pub fn set_active(&self, active: bool) {
        self.state.with(|s| s.policy.set_active(active));
        tracing::info!(active, "Artifact cache active flag changed");
    }

    pub fn set_cache_models(&self, enabled: bool) {
        self.state.with(|s| s.policy.set_cache_models(enabled));
    }

    pub fn set_cache_textures(&self, enabled: bool) {
        self.state.with(|s| s.policy.set_cache_textures(enabled));
    }

    pub fn set_cache_compressed_textures(&self, enabled: bool) {
        self.state.with(|s| s.policy.set_cache_compressed_textures(enabled));
    }

    pub fn set_cache_compiled_shaders(&self, enabled: bool) {
        self.state.with(|s| s.policy.set_cache_compiled_shaders(enabled));
    }

    /// Change the size limit; a smaller limit is enforced before returning
    pub fn set_max_size_kb(&self, max_size_kb: i64) -> Result<()> {
        let region = self.state.enter();
        region.with(|s| s.policy.set_max_size_kb(max_size_kb))?;
        tracing::info!(max_size_kb, "Artifact cache size limit changed");

        self.check_eviction();
        Ok(())
    }

    pub fn set_flush_interval_secs(&self, secs: i64) -> Result<()> {
        self.state.with(|s| s.policy.set_flush_interval_secs(secs))
    }

    /// Request read-only or read-write mode.
    ///
    /// Read-write is not guaranteed: the next write that fails for lack of
    /// permission switches back to read-only.
    pub fn set_read_only(&self, read_only: bool) {
        self.state.with(|s| s.policy.set_read_only(read_only));
        tracing::info!(read_only, "Artifact cache mode requested");
    }

    /// Move the cache to another root.
    ///
    /// A dirty index is flushed to the old root first. If that flush fails
    /// the old root's unflushed changes are dropped, and the new root starts
    /// in the mode requested before the switch; a failing write there
    /// switches it to read-only again. The new root's index is loaded and the
    /// size limit enforced against it.
    pub fn set_root_path(&self, root: impl Into<PathBuf>) {
        let root = root.into();
        let region = self.state.enter();

        if region.with(|s| s.store.root() == root.as_path()) {
            return;
        }

        let (requested_read_only, stale) =
            region.with(|s| (s.policy.read_only(), s.index.is_stale()));
        if stale && !self.flush_index() {
            let (old_root, dropped) =
                region.with(|s| (s.store.root().to_path_buf(), s.index.len()));
            tracing::warn!(
                old_root = %old_root.display(),
                entries = dropped,
                "Discarding unflushed artifact cache index of the previous root"
            );
        }

        let store = CacheStore::new(root.clone(), Arc::clone(&self.backend));
        let index = load_index(&store);
        region.with(|s| {
            s.policy.set_root_path(root.clone());
            s.policy.set_read_only(requested_read_only);
            s.store = store;
            s.index = index;
        });
        tracing::info!(root = %root.display(), "Artifact cache root changed");

        self.check_eviction();
    }

    /// Switch to read-only after a write failed for lack of permission
    fn enter_read_only(&self, error: &CacheError) {
        let switched = self.state.with(|s| {
            let was_read_only = s.policy.read_only();
            s.policy.set_read_only(true);
            !was_read_only
        });
        if switched {
            tracing::warn!("Artifact cache switching to read-only: {error}");
        }
    }
}
