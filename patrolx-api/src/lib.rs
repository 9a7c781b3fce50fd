//! Patrol-X API - HTTP gateway for the dashboard
//!
//! Proxies auth, zone, chat and notification calls to the CTR Center and
//! serves the latest-events payload from a single-slot cache that falls back
//! to the last good payload when the CTR Center is down. The `send_batches`
//! binary feeds collected channel messages to the CTR Center ingest endpoint.

pub mod config;
pub mod error;
pub mod ingest;
pub mod macros;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod upstream;

// Re-export commonly used types
pub use config::{ApiConfig, IngestConfig, UpstreamConfig};
pub use error::{ApiError, ApiResult, Envelope, ErrorCode, NotificationAction};
pub use routes::{api_routes, build_cors_layer, create_api_router};
pub use state::{AppState, EventsCache};
pub use upstream::{CtrCenterClient, NotificationQuery};
