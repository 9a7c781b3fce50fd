//! Prometheus Metrics Definitions
//!
//! Gateway metrics with bounded label sets. Exposed at `/metrics` for
//! Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance - initialized on first use
pub static METRICS: Lazy<ApiResult<PatrolxMetrics>> = Lazy::new(PatrolxMetrics::new);

/// Container for all Patrol-X metrics.
#[derive(Clone)]
pub struct PatrolxMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// CTR Center call counter - labels: operation, outcome
    pub upstream_requests_total: CounterVec,

    /// Events cache reads - labels: source (cache, upstream, stale-fallback, error)
    pub events_cache_total: CounterVec,
}

fn registration_error(name: &str, err: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, err))
}

impl PatrolxMetrics {
    /// Create and register all metrics with the default Prometheus registry.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "patrolx_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "patrolx_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("http_request_duration_seconds", e))?,

            upstream_requests_total: register_counter_vec!(
                "patrolx_upstream_requests_total",
                "Total number of CTR Center API calls",
                &["operation", "outcome"]
            )
            .map_err(|e| registration_error("upstream_requests_total", e))?,

            events_cache_total: register_counter_vec!(
                "patrolx_events_cache_total",
                "Events cache reads by answer source",
                &["source"]
            )
            .map_err(|e| registration_error("events_cache_total", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record one CTR Center call.
    pub fn record_upstream_request(&self, operation: &str, outcome: &str) {
        self.upstream_requests_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    /// Record how an events read was answered.
    pub fn record_cache(&self, source: &str) {
        self.events_cache_total.with_label_values(&[source]).inc();
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
pub async fn metrics_handler() -> impl IntoResponse {
    // Registers the gateway metrics even before the first request.
    if let Err(e) = METRICS.as_ref() {
        tracing::warn!(error = %e.message, "Metrics registry unavailable");
    }

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
