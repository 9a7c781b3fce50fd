//! Health Check and Probe Endpoints
//!
//! - /api/health - liveness plus upstream configuration and cache state
//! - /api/test - echoes the request body back
//!
//! Neither endpoint calls the CTR Center.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    routes::json_body,
    state::{AppState, EventsCache},
    upstream::CtrCenterClient,
};

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime_seconds: u64,
    pub upstream_configured: bool,
    pub events_cache: EventsCacheHealth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsCacheHealth {
    pub populated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_ms: Option<i64>,
    pub hits: u64,
    pub misses: u64,
    pub stale_fallbacks: u64,
}

impl EventsCacheHealth {
    pub fn from_cache(cache: &EventsCache) -> Self {
        let stats = cache.stats();
        let age_ms = cache.age_ms();
        Self {
            populated: age_ms.is_some(),
            age_ms,
            hits: stats.hits,
            misses: stats.misses,
            stale_fallbacks: stats.stale_fallbacks,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EchoResponse {
    pub status: &'static str,
    pub received: Value,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /api/health
pub async fn health(
    State(upstream): State<Arc<CtrCenterClient>>,
    State(cache): State<Arc<EventsCache>>,
    State(start_time): State<Instant>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: start_time.elapsed().as_secs(),
        upstream_configured: upstream.is_configured(),
        events_cache: EventsCacheHealth::from_cache(&cache),
    })
}

/// POST /api/test
pub async fn echo(payload: Result<Json<Value>, JsonRejection>) -> Json<EchoResponse> {
    let received = json_body(payload);
    tracing::debug!(body = %received, "Test probe received");
    Json(EchoResponse {
        status: "ok",
        received,
        timestamp: Utc::now(),
    })
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/test", post(echo))
}
