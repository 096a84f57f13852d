//! Process-wide cache manager
//!
//! The manager is built lazily on the first [`get_global`] call. The flush
//! helpers never build it, so calling them from a frame loop before any asset
//! was loaded costs nothing.

use crate::config::{PolicyConfig, PolicyConfigLoader};
use crate::manager::CacheManager;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::Arc;

static GLOBAL_CACHE: Lazy<Mutex<Option<Arc<CacheManager>>>> = Lazy::new(|| Mutex::new(None));

/// The process-wide manager, created from the loaded configuration on first use
pub fn get_global() -> Arc<CacheManager> {
    let mut slot = GLOBAL_CACHE.lock();
    if let Some(manager) = slot.as_ref() {
        return Arc::clone(manager);
    }

    let config = PolicyConfigLoader::load().unwrap_or_else(|e| {
        tracing::warn!("Invalid artifact cache configuration, using defaults: {e}");
        PolicyConfig::default()
    });
    let manager = Arc::new(CacheManager::new(config));
    *slot = Some(Arc::clone(&manager));
    manager
}

pub fn is_global_initialized() -> bool {
    GLOBAL_CACHE.lock().is_some()
}

fn existing() -> Option<Arc<CacheManager>> {
    GLOBAL_CACHE.lock().as_ref().map(Arc::clone)
}

/// Periodic flush hook; does nothing if the manager was never created
pub fn consider_flush_global() -> bool {
    existing().is_some_and(|manager| manager.consider_flush_index())
}

/// Immediate flush; does nothing if the manager was never created
pub fn flush_global() -> bool {
    existing().is_some_and(|manager| manager.flush_index())
}

/// Flush a dirty index and drop the global manager
pub fn shutdown_global() {
    let manager = GLOBAL_CACHE.lock().take();
    if let Some(manager) = manager {
        if !manager.shutdown() {
            tracing::warn!("Artifact cache index was not flushed at shutdown");
        }
    }
}

/// Replace the global manager, returning the previous one
pub fn install_global(manager: CacheManager) -> Option<Arc<CacheManager>> {
    GLOBAL_CACHE.lock().replace(Arc::new(manager))
}

/// Drop the global manager without flushing
pub fn reset_global() {
    GLOBAL_CACHE.lock().take();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_flush_helpers_do_not_construct() {
        reset_global();

        assert!(!consider_flush_global());
        assert!(!flush_global());
        assert!(!is_global_initialized());
    }

    #[test]
    #[serial]
    fn test_get_global_returns_same_instance() {
        let temp = TempDir::new().unwrap();
        reset_global();
        install_global(CacheManager::builder().with_root(temp.path()).build());

        let first = get_global();
        let second = get_global();
        assert!(Arc::ptr_eq(&first, &second));

        first.mark_index_stale();
        assert!(flush_global());
        assert!(temp.path().join(crate::storage::INDEX_FILE_NAME).exists());

        shutdown_global();
        assert!(!is_global_initialized());
    }
}
