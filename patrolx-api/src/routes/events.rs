//! Events REST API Routes
//!
//! The only cached routes. Both read the latest-events payload through the
//! shared [`EventsCache`]; `?refresh=true` bypasses freshness.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use patrolx_core::{aggregate_events, extract_events, EventsOverview};
use patrolx_storage::{CacheRead, CacheSource};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::{ApiError, ApiResult},
    state::{AppState, EventsCache},
    telemetry::METRICS,
    upstream::CtrCenterClient,
};

/// Response header naming where the payload came from.
pub const CACHE_HEADER: &str = "x-cache";

const EVENTS_FAILURE: &str = "Failed to fetch events from CTR Center API";

/// Source label recorded when no payload could be served.
const CACHE_ERROR_LABEL: &str = "error";

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshQuery {
    pub refresh: Option<String>,
}

impl RefreshQuery {
    /// Only the literal `true` forces a refresh.
    pub fn force_refresh(&self) -> bool {
        self.refresh.as_deref() == Some("true")
    }
}

/// City-wide status computed from the cached events payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralStatus {
    #[serde(flatten)]
    pub overview: EventsOverview,
    /// When the underlying payload was fetched.
    pub last_update: DateTime<Utc>,
    pub source: CacheSource,
    /// The extracted events, as upstream sent them, for per-category drill-down.
    pub raw_events: Vec<Map<String, Value>>,
}

impl GeneralStatus {
    pub fn from_read(read: &CacheRead<Value>) -> Self {
        let events = extract_events(read.value());
        let overview = aggregate_events(&events);
        Self {
            overview,
            last_update: DateTime::from_timestamp_millis(read.fetched_at_ms())
                .unwrap_or_else(Utc::now),
            source: read.source(),
            raw_events: events.into_iter().map(|event| event.fields).collect(),
        }
    }
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/events/latest - Latest events payload, as upstream sent it
pub async fn latest_events(
    State(upstream): State<Arc<CtrCenterClient>>,
    State(cache): State<Arc<EventsCache>>,
    query: Option<Query<RefreshQuery>>,
) -> ApiResult<Response> {
    let read = read_events(&upstream, &cache, force_refresh(query)).await?;
    let source = read.source();
    Ok(([(CACHE_HEADER, source.as_str())], Json(read.value())).into_response())
}

/// GET /api/events/summary - Per-zone counts and the general summary
pub async fn events_summary(
    State(upstream): State<Arc<CtrCenterClient>>,
    State(cache): State<Arc<EventsCache>>,
    query: Option<Query<RefreshQuery>>,
) -> ApiResult<Response> {
    let read = read_events(&upstream, &cache, force_refresh(query)).await?;
    let status = GeneralStatus::from_read(&read);

    tracing::debug!(
        zones = status.overview.zones.len(),
        events = status.overview.event_count,
        source = %status.source,
        "Events summary computed"
    );

    Ok(([(CACHE_HEADER, status.source.as_str())], Json(status)).into_response())
}

fn force_refresh(query: Option<Query<RefreshQuery>>) -> bool {
    query.is_some_and(|Query(q)| q.force_refresh())
}

async fn read_events(
    upstream: &CtrCenterClient,
    cache: &EventsCache,
    force_refresh: bool,
) -> ApiResult<CacheRead<Value>> {
    if !upstream.is_configured() {
        return Err(ApiError::not_configured());
    }

    let result = cache.get(force_refresh, upstream).await;

    let label = match &result {
        Ok(read) => read.source().as_str(),
        Err(_) => CACHE_ERROR_LABEL,
    };
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_cache(label);
    }

    result.map_err(|err| ApiError::upstream_failure(EVENTS_FAILURE, err.upstream()))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/events/latest", get(latest_events))
        .route("/events/summary", get(events_summary))
}
