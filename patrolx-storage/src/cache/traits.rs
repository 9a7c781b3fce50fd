//! Cache seams: the upstream fetcher and usage statistics.

use async_trait::async_trait;
use patrolx_core::UpstreamResult;
use serde::Serialize;

/// Source of fresh payloads for the cache.
///
/// The cache calls this on a miss or a forced refresh. Implementations own
/// their transport; the cache only sees the result.
#[async_trait]
pub trait PayloadFetcher<T>: Send + Sync {
    /// Fetch the current payload from upstream.
    async fn fetch(&self) -> UpstreamResult<T>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Reads answered from the slot within TTL.
    pub hits: u64,
    /// Reads that went to upstream.
    pub misses: u64,
    /// Failed refreshes answered with the previous payload.
    pub stale_fallbacks: u64,
    /// Upstream fetches that returned an error.
    pub upstream_failures: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
