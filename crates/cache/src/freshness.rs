//! Freshness tokens detect when a cached artifact no longer matches its source

use crate::errors::{CacheError, RecoveryHint, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Comparable snapshot of a source's state
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FreshnessToken(String);

impl FreshnessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Computes the freshness token of a live source
pub trait FreshnessProbe: Send + Sync {
    fn probe(&self, source: &Path) -> Result<FreshnessToken>;
}

/// Modification time plus length; cheap, good enough for local assets
#[derive(Debug, Clone, Copy, Default)]
pub struct ModifiedTimeProbe;

impl FreshnessProbe for ModifiedTimeProbe {
    fn probe(&self, source: &Path) -> Result<FreshnessToken> {
        let metadata = std::fs::metadata(source).map_err(|e| probe_error(source, e))?;
        let modified = metadata
            .modified()
            .map_err(|e| probe_error(source, e))?
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        Ok(FreshnessToken(format!(
            "mtime:{}.{:09}:{}",
            modified.as_secs(),
            modified.subsec_nanos(),
            metadata.len()
        )))
    }
}

/// SHA-256 of the source content; survives touch/checkout churn
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHashProbe;

impl FreshnessProbe for ContentHashProbe {
    fn probe(&self, source: &Path) -> Result<FreshnessToken> {
        let file = File::open(source).map_err(|e| probe_error(source, e))?;
        let mut reader = BufReader::new(file);
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 8192];

        loop {
            let read = reader
                .read(&mut buffer)
                .map_err(|e| probe_error(source, e))?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }

        Ok(FreshnessToken(format!(
            "sha256:{}",
            hex::encode(hasher.finalize())
        )))
    }
}

fn probe_error(source: &Path, error: std::io::Error) -> CacheError {
    CacheError::Io {
        path: source.to_path_buf(),
        operation: "probe source freshness",
        source: error,
        recovery_hint: RecoveryHint::LoadUncached,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_content_hash_tracks_content() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("brick.png");

        std::fs::write(&source, b"v1").unwrap();
        let first = ContentHashProbe.probe(&source).unwrap();
        assert_eq!(first, ContentHashProbe.probe(&source).unwrap());

        std::fs::write(&source, b"v2").unwrap();
        assert_ne!(first, ContentHashProbe.probe(&source).unwrap());
    }

    #[test]
    fn test_modified_time_tracks_length() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("hero.mesh");

        std::fs::write(&source, b"short").unwrap();
        let first = ModifiedTimeProbe.probe(&source).unwrap();

        std::fs::write(&source, b"a much longer body").unwrap();
        assert_ne!(first, ModifiedTimeProbe.probe(&source).unwrap());
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = ModifiedTimeProbe
            .probe(&temp_dir.path().join("missing"))
            .unwrap_err();
        assert!(matches!(err, CacheError::Io { .. }));
        assert_eq!(err.recovery_hint(), &RecoveryHint::LoadUncached);
    }
}
