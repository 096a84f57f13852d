//! Disk-backed cache for derived asset artifacts
//!
//! Loaders turn source assets (meshes, textures, shaders) into expensive
//! derived artifacts. This crate keeps those artifacts on disk between runs:
//! - lookups keyed by a fingerprint of source path, kind and load parameters
//! - freshness tokens so edited sources miss instead of serving stale data
//! - a size limit enforced by LRU eviction
//! - a binary index flushed cooperatively, with a read-only fallback when the
//!   cache root cannot be written
//!
//! Most programs use the process-wide manager from [`get_global`] and call
//! [`consider_flush_global`] once per frame or tick.

pub mod codec;
pub mod config;
pub mod errors;
pub mod eviction;
pub mod freshness;
pub mod global;
pub mod guard;
pub mod index;
pub mod keys;
pub mod manager;
pub mod policy;
pub mod storage;
pub mod types;

#[cfg(test)]
mod test_support;

pub use codec::{ArtifactCodec, JsonCodec, RawBytes};
pub use config::{PolicyConfig, PolicyConfigLoader, PolicyOverrides};
pub use errors::{CacheError, Error, RecoveryHint, Result};
pub use eviction::{EvictionPolicy, EvictionReport, LruPolicy};
pub use freshness::{ContentHashProbe, FreshnessProbe, FreshnessToken, ModifiedTimeProbe};
pub use global::{
    consider_flush_global, flush_global, get_global, install_global, is_global_initialized,
    reset_global, shutdown_global,
};
pub use index::{CacheIndex, CacheRecord};
pub use keys::{ArtifactKind, CacheKey, Fingerprinter, Sha256Fingerprinter, SourceDescriptor};
pub use manager::{CacheManager, CacheManagerBuilder, CacheStatistics};
pub use policy::PolicyState;
pub use storage::{CacheStore, DiskBackend, StorageBackend};
pub use types::{CachedArtifact, Lookup, SkipReason, StoreOutcome, VerifyReport};
