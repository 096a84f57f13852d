//! Error handling for the artifact cache
//!
//! Every failure carries a [`RecoveryHint`] so callers (and the cache itself)
//! can decide whether to retry, fall back to uncached loading, or give up.

mod conversions;
mod display;
mod recovery;
mod types;

pub use types::*;
