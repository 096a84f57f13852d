//! Results of cache operations

use crate::keys::{ArtifactKind, CacheKey};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// A fresh artifact found in the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedArtifact {
    pub key: CacheKey,
    pub kind: ArtifactKind,
    /// Absolute path of the stored artifact
    pub path: PathBuf,
    pub size: u64,
}

/// Answer to a lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Caching is off for this kind (or globally); load directly and do not store
    NotApplicable,
    /// Nothing usable cached; compute and store
    Miss,
    Hit(CachedArtifact),
}

impl Lookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    pub fn hit(self) -> Option<CachedArtifact> {
        match self {
            Lookup::Hit(artifact) => Some(artifact),
            _ => None,
        }
    }
}

/// Why a store left the cache untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ReadOnly,
    KindDisabled,
    /// The source could not be probed for freshness
    SourceUnavailable,
    /// Writing the artifact failed; the cache may have switched to read-only
    WriteFailed,
    /// The root path changed while the artifact was being written
    RootChanged,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::ReadOnly => "cache is read-only",
            SkipReason::KindDisabled => "caching disabled for this kind",
            SkipReason::SourceUnavailable => "source unavailable",
            SkipReason::WriteFailed => "artifact write failed",
            SkipReason::RootChanged => "cache root changed during store",
        })
    }
}

/// Result of a store. Skipping is expected degraded behavior, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    Stored { key: CacheKey, size: u64 },
    Skipped(SkipReason),
}

impl StoreOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, StoreOutcome::Stored { .. })
    }
}

/// Result of re-checking index records against the disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub checked: usize,
    /// Records dropped because their artifact is gone
    pub missing: Vec<CacheKey>,
    /// Records whose size was corrected
    pub resized: Vec<CacheKey>,
    /// Records that could not be checked
    pub errors: usize,
}
