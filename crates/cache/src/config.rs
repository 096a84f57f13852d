//! Cache configuration with precedence: defaults, config file, environment
use crate::errors::{Error, RecoveryHint, Result, SerializationOp};
use crate::policy::non_negative;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default size limit: 1 GiB
pub const DEFAULT_MAX_SIZE_KB: u64 = 1024 * 1024;

/// Default flush interval in seconds
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 60;

/// Environment variable prefix for every cache setting
pub const ENV_PREFIX: &str = "ARTIFACT_CACHE_";

/// Complete policy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Global switch; per-kind flags only apply while active
    pub active: bool,
    pub cache_models: bool,
    pub cache_textures: bool,
    pub cache_compressed_textures: bool,
    pub cache_compiled_shaders: bool,
    /// Maximum on-disk footprint in kilobytes
    pub max_size_kb: u64,
    /// Maximum time the index may stay dirty before a flush is due
    pub flush_interval_secs: u64,
    /// Directory holding the index and the artifacts
    pub root_path: PathBuf,
    /// Requested read-only mode
    pub read_only: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            active: true,
            cache_models: true,
            cache_textures: true,
            cache_compressed_textures: true,
            cache_compiled_shaders: true,
            max_size_kb: DEFAULT_MAX_SIZE_KB,
            flush_interval_secs: DEFAULT_FLUSH_INTERVAL_SECS,
            root_path: default_root_path(),
            read_only: false,
        }
    }
}

impl PolicyConfig {
    /// Apply overrides in place; unset fields keep their current value
    pub fn apply(&mut self, overrides: PolicyOverrides) {
        if let Some(active) = overrides.active {
            self.active = active;
        }
        if let Some(enabled) = overrides.cache_models {
            self.cache_models = enabled;
        }
        if let Some(enabled) = overrides.cache_textures {
            self.cache_textures = enabled;
        }
        if let Some(enabled) = overrides.cache_compressed_textures {
            self.cache_compressed_textures = enabled;
        }
        if let Some(enabled) = overrides.cache_compiled_shaders {
            self.cache_compiled_shaders = enabled;
        }
        if let Some(max_size_kb) = overrides.max_size_kb {
            self.max_size_kb = max_size_kb;
        }
        if let Some(secs) = overrides.flush_interval_secs {
            self.flush_interval_secs = secs;
        }
        if let Some(root) = overrides.root_path {
            self.root_path = root;
        }
        if let Some(read_only) = overrides.read_only {
            self.read_only = read_only;
        }
    }
}

/// Partial configuration from a single source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyOverrides {
    pub active: Option<bool>,
    pub cache_models: Option<bool>,
    pub cache_textures: Option<bool>,
    pub cache_compressed_textures: Option<bool>,
    pub cache_compiled_shaders: Option<bool>,
    pub max_size_kb: Option<u64>,
    pub flush_interval_secs: Option<u64>,
    pub root_path: Option<PathBuf>,
    pub read_only: Option<bool>,
}

impl PolicyOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Configuration loader that handles precedence
pub struct PolicyConfigLoader;

impl PolicyConfigLoader {
    /// Load configuration from the default config file and the process environment
    pub fn load() -> Result<PolicyConfig> {
        let config_path = Self::config_file_path();
        Self::load_with(config_path.as_deref(), |name| std::env::var(name).ok())
    }

    /// Load configuration from an explicit file and variable lookup
    pub fn load_with<F>(config_path: Option<&Path>, lookup: F) -> Result<PolicyConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = PolicyConfig::default();

        if let Some(path) = config_path {
            if let Some(file_overrides) = Self::load_from_file(path)? {
                tracing::debug!("Applying cache configuration from {}", path.display());
                config.apply(file_overrides);
            }
        }

        let env_overrides = Self::load_from_env(lookup)?;
        if !env_overrides.is_empty() {
            tracing::debug!("Applying cache configuration from {ENV_PREFIX}* variables");
            config.apply(env_overrides);
        }

        Ok(config)
    }

    /// Read overrides from a JSON file; a missing file is not an error
    pub fn load_from_file(path: &Path) -> Result<Option<PolicyOverrides>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| Error::Io {
            path: path.to_path_buf(),
            operation: "read config file",
            source: e,
            recovery_hint: RecoveryHint::CheckPermissions {
                path: path.to_path_buf(),
            },
        })?;

        let overrides = serde_json::from_str(&content).map_err(|e| Error::Serialization {
            key: path.display().to_string(),
            operation: SerializationOp::Decode,
            source: Box::new(e),
            recovery_hint: RecoveryHint::Manual {
                instructions: "Check config file syntax".to_string(),
            },
        })?;

        Ok(Some(overrides))
    }

    /// Read overrides from `ARTIFACT_CACHE_*` variables
    pub fn load_from_env<F>(lookup: F) -> Result<PolicyOverrides>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let name = format!("{ENV_PREFIX}{suffix}");
            lookup(&name).map(|value| (name, value))
        };

        let bool_var = |suffix: &str| -> Result<Option<bool>> {
            var(suffix)
                .map(|(name, value)| parse_bool(&name, &value))
                .transpose()
        };

        let size_var = |suffix: &str| -> Result<Option<u64>> {
            var(suffix)
                .map(|(name, value)| parse_non_negative(&name, &value))
                .transpose()
        };

        Ok(PolicyOverrides {
            active: bool_var("ACTIVE")?,
            cache_models: bool_var("MODELS")?,
            cache_textures: bool_var("TEXTURES")?,
            cache_compressed_textures: bool_var("COMPRESSED_TEXTURES")?,
            cache_compiled_shaders: bool_var("SHADERS")?,
            max_size_kb: size_var("MAX_SIZE_KB")?,
            flush_interval_secs: size_var("FLUSH_INTERVAL_SECS")?,
            root_path: var("ROOT").map(|(_, value)| PathBuf::from(value)),
            read_only: bool_var("READ_ONLY")?,
        })
    }

    /// Get the configuration file path
    pub fn config_file_path() -> Option<PathBuf> {
        let config_dir = match std::env::var_os("XDG_CONFIG_HOME") {
            Some(dir) => Some(PathBuf::from(dir)),
            None => dirs::config_dir(),
        }?;

        Some(config_dir.join("artifact-cache").join("config.json"))
    }
}

/// Default cache root under the platform cache directory
pub fn default_root_path() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("artifact-cache"))
        .unwrap_or_else(|| PathBuf::from(".artifact-cache"))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Configuration {
            message: format!("{name} must be a boolean, got '{other}'"),
            recovery_hint: RecoveryHint::UseDefault {
                value: "true".to_string(),
            },
        }),
    }
}

fn parse_non_negative(name: &str, value: &str) -> Result<u64> {
    let parsed = value
        .trim()
        .parse::<i64>()
        .map_err(|e| Error::Configuration {
            message: format!("{name} must be an integer, got '{value}': {e}"),
            recovery_hint: RecoveryHint::Manual {
                instructions: format!("Unset {name} or give it a whole number"),
            },
        })?;

    non_negative(name, parsed)
}
