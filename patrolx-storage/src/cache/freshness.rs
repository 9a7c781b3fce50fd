//! Where a cache read came from.
//!
//! Every read carries its provenance so callers (and response headers) can
//! tell a fresh hit from a payload served in place of a failed refresh.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Provenance of a payload returned by the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheSource {
    /// Served from the slot, within TTL.
    Cache,
    /// Fetched from upstream during this call.
    Upstream,
    /// Upstream failed; the previous payload was served instead.
    StaleFallback,
}

impl CacheSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Upstream => "upstream",
            Self::StaleFallback => "stale-fallback",
        }
    }
}

impl fmt::Display for CacheSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload stored in the slot together with its fetch time.
#[derive(Debug)]
pub struct CachedPayload<T> {
    pub data: Arc<T>,
    pub fetched_at_ms: i64,
}

impl<T> CachedPayload<T> {
    pub fn new(data: T, fetched_at_ms: i64) -> Self {
        Self {
            data: Arc::new(data),
            fetched_at_ms,
        }
    }

    /// Milliseconds elapsed since the fetch, never negative.
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.fetched_at_ms).max(0)
    }
}

// Manual impl: cloning shares the payload and must not require `T: Clone`.
impl<T> Clone for CachedPayload<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            fetched_at_ms: self.fetched_at_ms,
        }
    }
}

/// Result of a cache read.
#[derive(Debug)]
pub struct CacheRead<T> {
    entry: CachedPayload<T>,
    source: CacheSource,
}

impl<T> CacheRead<T> {
    pub fn new(entry: CachedPayload<T>, source: CacheSource) -> Self {
        Self { entry, source }
    }

    pub fn value(&self) -> &T {
        &self.entry.data
    }

    /// Shared handle to the payload; hits hand out the same allocation.
    pub fn shared(&self) -> Arc<T> {
        Arc::clone(&self.entry.data)
    }

    pub fn fetched_at_ms(&self) -> i64 {
        self.entry.fetched_at_ms
    }

    pub fn source(&self) -> CacheSource {
        self.source
    }

    pub fn was_cache_hit(&self) -> bool {
        self.source == CacheSource::Cache
    }

    pub fn is_stale_fallback(&self) -> bool {
        self.source == CacheSource::StaleFallback
    }

    pub fn into_entry(self) -> CachedPayload<T> {
        self.entry
    }
}
