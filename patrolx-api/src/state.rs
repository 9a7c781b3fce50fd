//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use patrolx_storage::{CacheConfig, SlotCache};
use serde_json::Value;

use crate::upstream::CtrCenterClient;

/// Cache for the latest-events payload. The payload is kept as opaque JSON.
pub type EventsCache = SlotCache<Value>;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<CtrCenterClient>,
    /// Constructed once at startup. Every events route reads through it.
    pub events_cache: Arc<EventsCache>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(upstream: CtrCenterClient, cache_config: CacheConfig) -> Self {
        Self::with_cache(upstream, SlotCache::new(cache_config))
    }

    pub fn with_cache(upstream: CtrCenterClient, events_cache: EventsCache) -> Self {
        Self {
            upstream: Arc::new(upstream),
            events_cache: Arc::new(events_cache),
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(Arc<CtrCenterClient>, upstream);
crate::impl_from_ref!(Arc<EventsCache>, events_cache);
crate::impl_from_ref!(Instant, start_time);
