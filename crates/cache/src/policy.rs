//! Runtime cache policy: what gets cached, how much, and whether we may write

use crate::config::PolicyConfig;
use crate::errors::{CacheError, RecoveryHint, Result};
use crate::keys::ArtifactKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Mutable policy flags and limits.
///
/// Per-kind queries always fold in `active`; the raw per-kind flags are kept
/// untouched while the cache is inactive and come back when it is re-enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyState {
    active: bool,
    cache_models: bool,
    cache_textures: bool,
    cache_compressed_textures: bool,
    cache_compiled_shaders: bool,
    max_size_kb: u64,
    flush_interval_secs: u64,
    root_path: PathBuf,
    read_only: bool,
}

impl PolicyState {
    pub fn active(&self) -> bool {
        self.active
    }

    pub fn cache_models(&self) -> bool {
        self.active && self.cache_models
    }

    pub fn cache_textures(&self) -> bool {
        self.active && self.cache_textures
    }

    pub fn cache_compressed_textures(&self) -> bool {
        self.active && self.cache_compressed_textures
    }

    pub fn cache_compiled_shaders(&self) -> bool {
        self.active && self.cache_compiled_shaders
    }

    pub fn cache_enabled_for(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::Model => self.cache_models(),
            ArtifactKind::Texture => self.cache_textures(),
            ArtifactKind::CompressedTexture => self.cache_compressed_textures(),
            ArtifactKind::CompiledShader => self.cache_compiled_shaders(),
        }
    }

    pub fn max_size_kb(&self) -> u64 {
        self.max_size_kb
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_kb.saturating_mul(1024)
    }

    pub fn flush_interval_secs(&self) -> u64 {
        self.flush_interval_secs
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn set_cache_models(&mut self, enabled: bool) {
        self.cache_models = enabled;
    }

    pub fn set_cache_textures(&mut self, enabled: bool) {
        self.cache_textures = enabled;
    }

    pub fn set_cache_compressed_textures(&mut self, enabled: bool) {
        self.cache_compressed_textures = enabled;
    }

    pub fn set_cache_compiled_shaders(&mut self, enabled: bool) {
        self.cache_compiled_shaders = enabled;
    }

    pub fn set_max_size_kb(&mut self, max_size_kb: i64) -> Result<()> {
        self.max_size_kb = non_negative("max size (KB)", max_size_kb)?;
        Ok(())
    }

    pub fn set_flush_interval_secs(&mut self, secs: i64) -> Result<()> {
        self.flush_interval_secs = non_negative("flush interval (seconds)", secs)?;
        Ok(())
    }

    pub fn set_root_path(&mut self, root: PathBuf) {
        self.root_path = root;
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Snapshot back into the serializable configuration form
    pub fn to_config(&self) -> PolicyConfig {
        PolicyConfig {
            active: self.active,
            cache_models: self.cache_models,
            cache_textures: self.cache_textures,
            cache_compressed_textures: self.cache_compressed_textures,
            cache_compiled_shaders: self.cache_compiled_shaders,
            max_size_kb: self.max_size_kb,
            flush_interval_secs: self.flush_interval_secs,
            root_path: self.root_path.clone(),
            read_only: self.read_only,
        }
    }
}

impl From<PolicyConfig> for PolicyState {
    fn from(config: PolicyConfig) -> Self {
        Self {
            active: config.active,
            cache_models: config.cache_models,
            cache_textures: config.cache_textures,
            cache_compressed_textures: config.cache_compressed_textures,
            cache_compiled_shaders: config.cache_compiled_shaders,
            max_size_kb: config.max_size_kb,
            flush_interval_secs: config.flush_interval_secs,
            root_path: config.root_path,
            read_only: config.read_only,
        }
    }
}

impl Default for PolicyState {
    fn default() -> Self {
        PolicyConfig::default().into()
    }
}

pub(crate) fn non_negative(what: &str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| CacheError::Configuration {
        message: format!("{what} must be >= 0, got {value}"),
        recovery_hint: RecoveryHint::Manual {
            instructions: "Provide a non-negative value".to_string(),
        },
    })
}
