//! Notification REST API Routes
//!
//! Listing and marking notifications read. The caller's `Authorization`
//! header is forwarded untouched; the gateway never inspects the token.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header::AUTHORIZATION, HeaderMap},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::{ApiError, ApiResult, NotificationAction},
    routes::json_body,
    state::AppState,
    upstream::{CtrCenterClient, NotificationQuery},
};

const LIST_FAILURE: &str = "Failed to fetch notifications from CTR Center API";

/// Page size when the caller gives none (or gives garbage).
pub const DEFAULT_NOTIFICATION_LIMIT: i64 = 50;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListNotificationsParams {
    pub unread_only: Option<String>,
    pub limit: Option<String>,
}

impl ListNotificationsParams {
    pub fn to_query(&self) -> NotificationQuery {
        NotificationQuery {
            unread_only: self.unread_only.as_deref() == Some("true"),
            limit: parse_limit(self.limit.as_deref()),
        }
    }
}

/// Leading-integer parse: optional whitespace and sign, then digits, rest
/// ignored. Zero, absent or unparseable values give the default.
pub fn parse_limit(raw: Option<&str>) -> i64 {
    let Some(raw) = raw else {
        return DEFAULT_NOTIFICATION_LIMIT;
    };

    let trimmed = raw.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    match digits[..end].parse::<i64>() {
        Ok(0) | Err(_) => DEFAULT_NOTIFICATION_LIMIT,
        Ok(value) => sign * value,
    }
}

/// `notificationId` as a path segment. Strings and numbers are accepted;
/// empty strings and zero count as missing.
pub fn notification_id(body: &Value) -> Option<String> {
    match body.get("notificationId")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        _ => None,
    }
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok())
}

fn require_configured(upstream: &CtrCenterClient) -> ApiResult<()> {
    if upstream.is_configured() {
        Ok(())
    } else {
        Err(ApiError::not_configured())
    }
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/notifications - List the caller's notifications
pub async fn list_notifications(
    State(upstream): State<Arc<CtrCenterClient>>,
    headers: HeaderMap,
    params: Option<Query<ListNotificationsParams>>,
) -> ApiResult<Json<Value>> {
    require_configured(&upstream)?;

    let query = params.map(|Query(p)| p).unwrap_or_default().to_query();
    let auth = authorization(&headers);
    if auth.is_some() {
        tracing::debug!("Forwarding Authorization header");
    }

    let body = upstream
        .notifications(query, auth)
        .await
        .map_err(|err| ApiError::upstream_failure(LIST_FAILURE, &err))?;
    Ok(Json(body))
}

/// POST /api/notifications - Mark one notification read
pub async fn mark_read(
    State(upstream): State<Arc<CtrCenterClient>>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let body = json_body(payload);
    let id = notification_id(&body)
        .ok_or_else(|| ApiError::validation("notificationId is required").in_status_envelope())?;

    require_configured(&upstream)?;

    let auth = authorization(&headers);
    if auth.is_none() {
        tracing::warn!(notification_id = %id, "No Authorization header on notification update");
    }

    let body = upstream
        .mark_notification_read(&id, auth)
        .await
        .map_err(|err| ApiError::notification_failure(NotificationAction::MarkRead, &err))?;

    tracing::info!(notification_id = %id, "Notification marked as read");
    Ok(Json(body))
}

/// POST /api/notifications/read-all - Mark every notification read
pub async fn mark_all_read(
    State(upstream): State<Arc<CtrCenterClient>>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    require_configured(&upstream)?;

    let auth = authorization(&headers);
    if auth.is_none() {
        tracing::warn!("No Authorization header on notification update");
    }

    let body = upstream
        .mark_all_notifications_read(auth)
        .await
        .map_err(|err| ApiError::notification_failure(NotificationAction::MarkAllRead, &err))?;

    tracing::info!("All notifications marked as read");
    Ok(Json(body))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications).post(mark_read))
        .route("/notifications/read-all", post(mark_all_read))
}
