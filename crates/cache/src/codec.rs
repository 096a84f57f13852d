//! Boundary between the cache and the loaders that produce artifacts
//!
//! The cache stores payloads verbatim. Loaders plug in through
//! [`ArtifactCodec`] so no asset format leaks into the cache core.

use crate::errors::{CacheError, RecoveryHint, Result, SerializationOp};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// Turns a loader's artifact into bytes and back
pub trait ArtifactCodec {
    type Artifact;

    fn encode(&self, artifact: &Self::Artifact) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Artifact>;
}

/// Identity codec for loaders that already produce bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBytes;

impl ArtifactCodec for RawBytes {
    type Artifact = Vec<u8>;

    fn encode(&self, artifact: &Vec<u8>) -> Result<Vec<u8>> {
        Ok(artifact.clone())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

/// JSON codec for artifacts that are plain serde data (material tables etc.)
#[derive(Debug)]
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> ArtifactCodec for JsonCodec<T> {
    type Artifact = T;

    fn encode(&self, artifact: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(artifact).map_err(|e| CacheError::Serialization {
            key: std::any::type_name::<T>().to_string(),
            operation: SerializationOp::Encode,
            source: Box::new(e),
            recovery_hint: RecoveryHint::LoadUncached,
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::Serialization {
            key: std::any::type_name::<T>().to_string(),
            operation: SerializationOp::Decode,
            source: Box::new(e),
            recovery_hint: RecoveryHint::LoadUncached,
        })
    }
}
