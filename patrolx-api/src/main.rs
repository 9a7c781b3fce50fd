//! Patrol-X API Server Entry Point
//!
//! Loads configuration from the environment, builds the events cache and
//! the CTR Center client, and starts the Axum HTTP server.

use std::net::SocketAddr;

use axum::Router;
use patrolx_api::{create_api_router, ApiConfig, ApiError, ApiResult, AppState, CtrCenterClient};

use patrolx_api::telemetry::{init_tracing, TelemetryConfig};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config)?;

    let api_config = ApiConfig::from_env();
    let upstream = CtrCenterClient::new(api_config.upstream.clone()).map_err(|e| {
        ApiError::internal_error(format!("Failed to initialize CTR Center client: {}", e))
    })?;

    tracing::info!(
        upstream_configured = upstream.is_configured(),
        cache_ttl_ms = api_config.events_cache.ttl.as_millis() as u64,
        coalesce_misses = api_config.events_cache.coalesce_misses,
        "Gateway configured"
    );

    let state = AppState::new(upstream, api_config.events_cache.clone());
    let app: Router = create_api_router(state, &api_config);

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting Patrol-X API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("PATROLX_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::validation(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::validation(format!("Invalid bind address {}: {}", addr, e)))
}
