//! REST API Routes Module
//!
//! Every dashboard route lives under `/api`:
//! - Events (cached latest payload and the aggregated overview)
//! - Zone detail, chat, auth and notifications (proxied, uncached)
//! - Health and the connectivity probe
//!
//! `/metrics` is mounted at the root for Prometheus.

pub mod ask;
pub mod auth;
pub mod events;
pub mod health;
pub mod notifications;
pub mod zone;

use std::time::Duration;

use axum::{
    extract::rejection::JsonRejection,
    http::{header, header::HeaderName, HeaderValue, Method},
    middleware::from_fn,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

// Re-export route creation functions for convenience
pub use ask::create_router as ask_router;
pub use auth::create_router as auth_router;
pub use events::create_router as events_router;
pub use health::create_router as health_router;
pub use notifications::create_router as notifications_router;
pub use zone::create_router as zone_router;

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// With no configured origins every origin is allowed, which is what the
/// dashboard's dev server needs.
pub fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([HeaderName::from_static(events::CACHE_HEADER)])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: allowing all origins");
        cors.allow_origin(Any).allow_headers(Any)
    } else {
        tracing::info!("CORS: allowing origins: {:?}", config.cors_origins);
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Routes mounted under `/api`, still waiting for their state.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::create_router())
        .merge(events::create_router())
        .merge(zone::create_router())
        .merge(ask::create_router())
        .merge(auth::create_router())
        .merge(notifications::create_router())
}

/// Create the complete router.
///
/// # Middleware Order (outer to inner)
/// 1. CORS - answers preflight requests
/// 2. Observability - tracing span, metrics, completion log
pub fn create_api_router(state: AppState, config: &ApiConfig) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(build_cors_layer(config))
                .layer(from_fn(observability_middleware)),
        )
}

// ============================================================================
// REQUEST HELPERS
// ============================================================================

/// Body of a JSON request, or `Null` when it is missing or malformed.
///
/// Validation then reports the missing fields instead of a parse error.
pub(crate) fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Value {
    match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            tracing::debug!(reason = %rejection.body_text(), "Ignoring unreadable JSON body");
            Value::Null
        }
    }
}

/// A string field that is present and not blank.
pub(crate) fn required_str<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
}

/// Truthiness as the dashboard's JSON producers see it: `null`, `false`,
/// `0` and `""` are falsy.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert!(!is_truthy(&falsy), "{falsy} should be falsy");
        }
        for truthy in [json!(true), json!(-1), json!("0"), json!([]), json!({})] {
            assert!(is_truthy(&truthy), "{truthy} should be truthy");
        }
    }

    #[test]
    fn test_required_str() {
        let body = json!({"a": "x", "b": "   ", "c": 5});
        assert_eq!(required_str(&body, "a"), Some("x"));
        assert_eq!(required_str(&body, "b"), None);
        assert_eq!(required_str(&body, "c"), None);
        assert_eq!(required_str(&body, "missing"), None);
        assert_eq!(required_str(&Value::Null, "a"), None);
    }

    #[test]
    fn test_cors_layer_builds_for_both_modes() {
        let _open = build_cors_layer(&ApiConfig::default());

        let config = ApiConfig {
            cors_origins: vec!["https://patrolx.example".to_string()],
            cors_allow_credentials: true,
            ..ApiConfig::default()
        };
        let _restricted = build_cors_layer(&config);
    }
}
