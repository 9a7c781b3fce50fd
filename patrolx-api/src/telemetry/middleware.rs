//! Axum Middleware for HTTP Request Tracing and Metrics
//!
//! Wraps every request in a `tracing` span, records Prometheus metrics and
//! logs completion. Paths are labelled by their matched route template so
//! zone names and notification ids never become label values.

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{info_span, Instrument};

use super::metrics::METRICS;

/// Label for requests that matched no route.
const UNMATCHED_ROUTE: &str = "unmatched";

fn has_bearer_token(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("Bearer "))
}

/// Observability middleware for Axum.
///
/// Must be installed with `Router::layer` so `MatchedPath` is available.
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());

    let span = info_span!(
        "http_request",
        http.method = %method,
        http.target = %path,
        http.route = %route,
    );

    if has_bearer_token(request.headers()) {
        // The token itself is never logged.
        span.in_scope(|| tracing::debug!("Bearer token present"));
    }

    let response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    let status = response.status();

    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_http_request(method.as_str(), &route, status.as_u16(), duration.as_secs_f64());
    }

    tracing::info!(
        method = %method,
        path = %path,
        route = %route,
        status = status.as_u16(),
        duration_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, routing::get, Router};
    use tower::ServiceExt;

    #[test]
    fn test_bearer_detection() {
        let mut headers = HeaderMap::new();
        assert!(!has_bearer_token(&headers));

        headers.insert(AUTHORIZATION, "Basic abc".parse().unwrap());
        assert!(!has_bearer_token(&headers));

        headers.insert(AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert!(has_bearer_token(&headers));
    }

    #[tokio::test]
    async fn test_middleware_labels_by_route_template() {
        let app = Router::new()
            .route("/zone/:zone", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn(observability_middleware));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/zone/Delmas")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let metrics = METRICS.as_ref().unwrap();
        let counter = metrics
            .http_requests_total
            .with_label_values(&["GET", "/zone/:zone", "200"]);
        assert!(counter.get() >= 1.0);
    }
}
