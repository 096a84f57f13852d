//! Cache keys: artifact kinds, source descriptors and fingerprinting

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Kinds of derived artifacts the cache knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArtifactKind {
    Model,
    Texture,
    CompressedTexture,
    CompiledShader,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Model,
        ArtifactKind::Texture,
        ArtifactKind::CompressedTexture,
        ArtifactKind::CompiledShader,
    ];

    /// Directory under the cache root holding artifacts of this kind
    pub const fn dir_name(self) -> &'static str {
        match self {
            ArtifactKind::Model => "models",
            ArtifactKind::Texture => "textures",
            ArtifactKind::CompressedTexture => "compressed-textures",
            ArtifactKind::CompiledShader => "shaders",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArtifactKind::Model => "model",
            ArtifactKind::Texture => "texture",
            ArtifactKind::CompressedTexture => "compressed-texture",
            ArtifactKind::CompiledShader => "compiled-shader",
        })
    }
}

/// Describes one load request: which source, what gets derived, and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    /// Load-time parameters; ordered so the fingerprint is stable
    pub params: BTreeMap<String, String>,
}

impl SourceDescriptor {
    pub fn new(path: impl Into<PathBuf>, kind: ArtifactKind) -> Self {
        Self {
            path: path.into(),
            kind,
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

/// Opaque, stable identifier of a cache record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap an already computed fingerprint.
    ///
    /// Keys end up in file names, so anything outside `[0-9a-zA-Z_-]` is
    /// rejected.
    pub fn new(fingerprint: impl Into<String>) -> Option<Self> {
        let fingerprint = fingerprint.into();
        let valid = fingerprint.len() >= 2
            && fingerprint
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        valid.then_some(Self(fingerprint))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CacheKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CacheKey::new(value.clone()).ok_or_else(|| format!("invalid cache key '{value}'"))
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives cache keys from source descriptors
pub trait Fingerprinter: Send + Sync {
    fn fingerprint(&self, source: &SourceDescriptor) -> CacheKey;
}

/// SHA-256 over the normalized path, the kind and the sorted parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Fingerprinter;

impl Fingerprinter for Sha256Fingerprinter {
    fn fingerprint(&self, source: &SourceDescriptor) -> CacheKey {
        let mut hasher = Sha256::new();

        hasher.update(normalize_source_path(&source.path).as_bytes());
        hasher.update([0u8]);
        hasher.update(source.kind.to_string().as_bytes());
        hasher.update([0u8]);

        for (name, value) in &source.params {
            hasher.update(name.as_bytes());
            hasher.update([b'=']);
            hasher.update(value.as_bytes());
            hasher.update([0u8]);
        }

        CacheKey(hex::encode(hasher.finalize()))
    }
}

/// Normalize path separators so keys agree across platforms
pub fn normalize_source_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
