//! Single-slot read-through cache with stale fallback.
//!
//! The slot holds at most one payload. A read inside the TTL is answered
//! from the slot; anything else goes to the [`PayloadFetcher`]. When that
//! fetch fails, the previous payload is served instead of the error for as
//! long as `max_stale` allows.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use patrolx_core::UpstreamError;
use thiserror::Error;
use tokio::sync::Mutex;

use super::clock::{Clock, SystemClock};
use super::freshness::{CacheRead, CacheSource, CachedPayload};
use super::traits::{CacheStats, PayloadFetcher};

/// Configuration for the slot cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long a fetched payload is served without asking upstream.
    pub ttl: Duration,
    /// Oldest payload that may still be served when upstream fails.
    /// `None` means any age.
    pub max_stale: Option<Duration>,
    /// Serialize concurrent misses so only one reaches upstream.
    pub coalesce_misses: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30),
            max_stale: None,
            coalesce_misses: false,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_stale(mut self, max_stale: Option<Duration>) -> Self {
        self.max_stale = max_stale;
        self
    }

    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.coalesce_misses = enabled;
        self
    }

    fn ttl_ms(&self) -> i64 {
        duration_ms(self.ttl)
    }

    fn allows_stale(&self, age_ms: i64) -> bool {
        match self.max_stale {
            Some(limit) => age_ms <= duration_ms(limit),
            None => true,
        }
    }
}

fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// Errors surfaced by [`SlotCache::get`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CacheError {
    /// The refresh failed and there was nothing usable to fall back on.
    #[error("upstream unavailable: {source}")]
    UpstreamUnavailable {
        source: UpstreamError,
        /// Age of the payload that was too old to serve, if one existed.
        stale_age_ms: Option<i64>,
    },
}

impl CacheError {
    pub fn upstream(&self) -> &UpstreamError {
        match self {
            Self::UpstreamUnavailable { source, .. } => source,
        }
    }

    pub fn into_upstream(self) -> UpstreamError {
        match self {
            Self::UpstreamUnavailable { source, .. } => source,
        }
    }

    /// HTTP status reported by upstream, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        self.upstream().status()
    }
}

/// Process-local cache holding one payload.
///
/// Constructed once at startup and shared through application state. The
/// slot lock is synchronous and only held to clone or replace an `Arc`, never
/// across the upstream await.
pub struct SlotCache<T, C: Clock = SystemClock> {
    slot: RwLock<Option<CachedPayload<T>>>,
    config: CacheConfig,
    clock: C,
    refresh_gate: Mutex<()>,
    hits: AtomicU64,
    misses: AtomicU64,
    stale_fallbacks: AtomicU64,
    upstream_failures: AtomicU64,
}

impl<T> SlotCache<T, SystemClock> {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<T, C: Clock> SlotCache<T, C> {
    pub fn with_clock(config: CacheConfig, clock: C) -> Self {
        Self {
            slot: RwLock::new(None),
            config,
            clock,
            refresh_gate: Mutex::new(()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stale_fallbacks: AtomicU64::new(0),
            upstream_failures: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Current slot contents without touching counters or upstream.
    pub fn peek(&self) -> Option<CachedPayload<T>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Age of the cached payload, if any.
    pub fn age_ms(&self) -> Option<i64> {
        let now = self.clock.now_ms();
        self.peek().map(|entry| entry.age_ms(now))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale_fallbacks: self.stale_fallbacks.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
        }
    }

    fn fresh_entry(&self, now_ms: i64) -> Option<CachedPayload<T>> {
        self.peek()
            .filter(|entry| now_ms.saturating_sub(entry.fetched_at_ms) < self.config.ttl_ms())
    }

    fn hit(&self, entry: CachedPayload<T>) -> CacheRead<T> {
        self.hits.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(fetched_at_ms = entry.fetched_at_ms, "events cache hit");
        CacheRead::new(entry, CacheSource::Cache)
    }

    /// Store `entry` unless the slot already holds something newer.
    fn install(&self, entry: &CachedPayload<T>) -> bool {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        let newer = slot
            .as_ref()
            .map_or(true, |current| current.fetched_at_ms <= entry.fetched_at_ms);
        if newer {
            *slot = Some(entry.clone());
        }
        newer
    }
}

impl<T, C> SlotCache<T, C>
where
    T: Send + Sync,
    C: Clock,
{
    /// Read the payload, refreshing from `fetcher` when the slot is empty,
    /// expired, or `force_refresh` is set.
    pub async fn get<F>(&self, force_refresh: bool, fetcher: &F) -> Result<CacheRead<T>, CacheError>
    where
        F: PayloadFetcher<T> + ?Sized,
    {
        if !force_refresh {
            if let Some(entry) = self.fresh_entry(self.clock.now_ms()) {
                return Ok(self.hit(entry));
            }
        }

        if self.config.coalesce_misses && !force_refresh {
            let _gate = self.refresh_gate.lock().await;
            // Another request may have refreshed while we waited.
            if let Some(entry) = self.fresh_entry(self.clock.now_ms()) {
                return Ok(self.hit(entry));
            }
            return self.refresh(fetcher).await;
        }

        self.refresh(fetcher).await
    }

    async fn refresh<F>(&self, fetcher: &F) -> Result<CacheRead<T>, CacheError>
    where
        F: PayloadFetcher<T> + ?Sized,
    {
        self.misses.fetch_add(1, Ordering::Relaxed);
        let started_at = self.clock.now_ms();

        match fetcher.fetch().await {
            Ok(payload) => {
                let entry = CachedPayload::new(payload, started_at);
                if self.install(&entry) {
                    tracing::info!(fetched_at_ms = started_at, "events cache refreshed");
                } else {
                    tracing::debug!(
                        fetched_at_ms = started_at,
                        "newer payload already cached, keeping it"
                    );
                }
                Ok(CacheRead::new(entry, CacheSource::Upstream))
            }
            Err(error) => {
                self.upstream_failures.fetch_add(1, Ordering::Relaxed);
                let now = self.clock.now_ms();

                match self.peek() {
                    Some(entry) if self.config.allows_stale(entry.age_ms(now)) => {
                        self.stale_fallbacks.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            error = %error,
                            age_ms = entry.age_ms(now),
                            "upstream refresh failed, serving stale payload"
                        );
                        Ok(CacheRead::new(entry, CacheSource::StaleFallback))
                    }
                    stale => {
                        let stale_age_ms = stale.map(|entry| entry.age_ms(now));
                        tracing::warn!(
                            error = %error,
                            stale_age_ms = ?stale_age_ms,
                            "upstream refresh failed with no usable cached payload"
                        );
                        Err(CacheError::UpstreamUnavailable {
                            source: error,
                            stale_age_ms,
                        })
                    }
                }
            }
        }
    }
}
