//! Recovery utilities for cache errors

use super::types::{CacheError, RecoveryHint};

/// `EROFS`: identical on Linux and the BSDs
#[cfg(unix)]
const READ_ONLY_FILESYSTEM: i32 = 30;

impl CacheError {
    /// Get the recovery hint for this error
    #[must_use]
    pub const fn recovery_hint(&self) -> &RecoveryHint {
        match self {
            Self::Io { recovery_hint, .. }
            | Self::Serialization { recovery_hint, .. }
            | Self::Corruption { recovery_hint, .. }
            | Self::PermissionDenied { recovery_hint, .. }
            | Self::Configuration { recovery_hint, .. } => recovery_hint,
        }
    }

    /// Check if this error is transient and can be retried
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.recovery_hint(), RecoveryHint::Retry { .. })
    }

    /// Check if this error indicates data corruption
    #[must_use]
    pub const fn is_corruption(&self) -> bool {
        matches!(self, Self::Corruption { .. })
    }

    /// Check if this error means the cache root cannot be written.
    ///
    /// These failures switch the manager into read-only mode.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::PermissionDenied { .. } => true,
            Self::Io { source, .. } => {
                if source.kind() == std::io::ErrorKind::PermissionDenied {
                    return true;
                }
                #[cfg(unix)]
                if source.raw_os_error() == Some(READ_ONLY_FILESYSTEM) {
                    return true;
                }
                false
            }
            _ => false,
        }
    }
}
