//! Patrol-X Storage - Process-local caching
//!
//! The gateway keeps no persistent state. The only stateful component is the
//! events cache, which lives here behind the [`PayloadFetcher`] seam so it
//! can be exercised without an HTTP upstream.

pub mod cache;

pub use cache::{
    CacheConfig, CacheError, CacheRead, CacheSource, CacheStats, CachedPayload, Clock,
    ManualClock, PayloadFetcher, SlotCache, SystemClock,
};
