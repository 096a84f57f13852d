//! Cache manager builder and initialization

use super::CacheManager;
use crate::config::PolicyConfig;
use crate::eviction::{EvictionPolicy, LruPolicy};
use crate::freshness::{FreshnessProbe, ModifiedTimeProbe};
use crate::keys::{Fingerprinter, Sha256Fingerprinter};
use crate::storage::{DiskBackend, StorageBackend};
use std::path::PathBuf;
use std::sync::Arc;

/// Builder for CacheManager
#[derive(Default)]
pub struct CacheManagerBuilder {
    config: Option<PolicyConfig>,
    root: Option<PathBuf>,
    max_size_kb: Option<u64>,
    flush_interval_secs: Option<u64>,
    read_only: Option<bool>,
    backend: Option<Arc<dyn StorageBackend>>,
    fingerprinter: Option<Box<dyn Fingerprinter>>,
    probe: Option<Box<dyn FreshnessProbe>>,
    eviction: Option<Box<dyn EvictionPolicy>>,
}

impl CacheManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: PolicyConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_max_size_kb(mut self, max_size_kb: u64) -> Self {
        self.max_size_kb = Some(max_size_kb);
        self
    }

    pub fn with_flush_interval_secs(mut self, secs: u64) -> Self {
        self.flush_interval_secs = Some(secs);
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = Some(read_only);
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_fingerprinter(mut self, fingerprinter: impl Fingerprinter + 'static) -> Self {
        self.fingerprinter = Some(Box::new(fingerprinter));
        self
    }

    pub fn with_freshness_probe(mut self, probe: impl FreshnessProbe + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    pub fn with_eviction_policy(mut self, policy: impl EvictionPolicy + 'static) -> Self {
        self.eviction = Some(Box::new(policy));
        self
    }

    /// Build the manager. The index under the root is loaded (or started
    /// cold) and the size limit enforced against it.
    pub fn build(self) -> CacheManager {
        let mut config = self.config.unwrap_or_default();
        if let Some(root) = self.root {
            config.root_path = root;
        }
        if let Some(max_size_kb) = self.max_size_kb {
            config.max_size_kb = max_size_kb;
        }
        if let Some(secs) = self.flush_interval_secs {
            config.flush_interval_secs = secs;
        }
        if let Some(read_only) = self.read_only {
            config.read_only = read_only;
        }

        tracing::debug!(
            root = %config.root_path.display(),
            max_size_kb = config.max_size_kb,
            read_only = config.read_only,
            "Creating artifact cache manager"
        );

        let manager = CacheManager::from_parts(
            config,
            self.backend.unwrap_or_else(|| Arc::new(DiskBackend)),
            self.fingerprinter
                .unwrap_or_else(|| Box::new(Sha256Fingerprinter)),
            self.probe.unwrap_or_else(|| Box::new(ModifiedTimeProbe)),
            self.eviction.unwrap_or_else(|| Box::new(LruPolicy::new())),
        );
        manager.check_eviction();
        manager
    }
}
