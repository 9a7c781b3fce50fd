//! Events cache: one slot, TTL freshness, stale fallback on upstream failure.
//!
//! Reads return a [`CacheRead<T>`] tagged with its [`CacheSource`], so the
//! caller always knows whether it is looking at a fresh fetch, a hit, or a
//! payload kept alive because upstream is down.
//!
//! # Example
//!
//! ```ignore
//! let cache = SlotCache::new(CacheConfig::new().with_ttl(Duration::from_secs(30)));
//!
//! let read = cache.get(false, &client).await?;
//! if read.is_stale_fallback() {
//!     tracing::warn!(age_ms = ?cache.age_ms(), "serving stale events");
//! }
//! ```

pub mod clock;
pub mod freshness;
pub mod slot;
pub mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use freshness::{CacheRead, CacheSource, CachedPayload};
pub use slot::{CacheConfig, CacheError, SlotCache};
pub use traits::{CacheStats, PayloadFetcher};
