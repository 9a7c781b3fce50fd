//! API Configuration Module
//!
//! Configuration for the upstream CTR Center client, the events cache and
//! CORS. Everything is loaded from environment variables once at startup,
//! with defaults suitable for local development.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use patrolx_core::ConfigError;
use patrolx_storage::CacheConfig;

/// Base URL variable; the `VITE_` form is what the dashboard build uses.
pub const BASE_URL_VARS: &[&str] = &["API_CTR_CENTER_URL", "VITE_API_CTR_CENTER_URL"];
const EVENTS_ENDPOINT_VARS: &[&str] = &[
    "API_CTR_CENTER_URL_ENDPOINT",
    "VITE_API_CTR_CENTER_URL_ENDPOINT",
];
const LOCATION_ENDPOINT_VARS: &[&str] = &[
    "API_CTR_CENTER_URL_LOCATION_ENDPOINT",
    "VITE_API_CTR_CENTER_URL_LOCATION_ENDPOINT",
];
const CHAT_ENDPOINT_VARS: &[&str] = &[
    "API_CTR_CENTER_URL_CHAT_ENDPOINT",
    "VITE_API_CTR_CENTER_URL_CHAT_ENDPOINT",
];

const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_EVENTS_CACHE_TTL_MS: u64 = 30_000;

// ============================================================================
// ENVIRONMENT HELPERS
// ============================================================================

/// First non-blank value among `keys`, trimmed.
fn env_first(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| std::env::var(key).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn parse_value<T: FromStr>(field: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        field: field.to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Parse `key`, falling back to `default` (with a warning) when the value
/// does not parse.
fn env_parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + fmt::Debug,
    T::Err: fmt::Display,
{
    match env_first(&[key]) {
        None => default,
        Some(raw) => parse_value(key, &raw).unwrap_or_else(|err| {
            tracing::warn!(error = %err, default = ?default, "Invalid configuration value, using default");
            default
        }),
    }
}

fn env_flag(key: &str) -> bool {
    env_first(&[key])
        .map(|value| matches!(value.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Endpoint paths are appended to the base URL verbatim; make sure they start
/// with a slash.
fn endpoint(keys: &[&str], default: &str) -> String {
    let value = env_first(keys).unwrap_or_else(|| default.to_string());
    if value.starts_with('/') {
        value
    } else {
        format!("/{value}")
    }
}

// ============================================================================
// UPSTREAM CONFIGURATION
// ============================================================================

/// Where and how to reach the CTR Center API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    /// Base URL without trailing slash. `None` makes every proxied route
    /// answer 500.
    pub base_url: Option<String>,
    pub events_endpoint: String,
    pub location_endpoint: String,
    pub chat_endpoint: String,
    /// Per-request timeout for upstream calls.
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            events_endpoint: "/events/latest".to_string(),
            location_endpoint: "/location".to_string(),
            chat_endpoint: "/chat".to_string(),
            timeout: Duration::from_millis(DEFAULT_UPSTREAM_TIMEOUT_MS),
        }
    }
}

impl UpstreamConfig {
    /// Create UpstreamConfig from environment variables.
    ///
    /// Environment variables:
    /// - `API_CTR_CENTER_URL` / `VITE_API_CTR_CENTER_URL`: base URL (no default)
    /// - `API_CTR_CENTER_URL_ENDPOINT`: events path (default: /events/latest)
    /// - `API_CTR_CENTER_URL_LOCATION_ENDPOINT`: zone prefix (default: /location)
    /// - `API_CTR_CENTER_URL_CHAT_ENDPOINT`: chat path (default: /chat)
    /// - `UPSTREAM_TIMEOUT_MS`: request timeout (default: 30000)
    pub fn from_env() -> Self {
        let base_url = env_first(BASE_URL_VARS).map(|url| url.trim_end_matches('/').to_string());
        if base_url.is_none() {
            let err = ConfigError::MissingRequired {
                field: BASE_URL_VARS[0].to_string(),
            };
            tracing::warn!(error = %err, "Proxied routes will return 500 until it is configured");
        }

        Self {
            base_url,
            events_endpoint: endpoint(EVENTS_ENDPOINT_VARS, "/events/latest"),
            location_endpoint: endpoint(LOCATION_ENDPOINT_VARS, "/location"),
            chat_endpoint: endpoint(CHAT_ENDPOINT_VARS, "/chat"),
            timeout: Duration::from_millis(env_parse_or(
                "UPSTREAM_TIMEOUT_MS",
                DEFAULT_UPSTREAM_TIMEOUT_MS,
            )),
        }
    }

    /// Configuration pointing at `base_url` with default paths.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: Some(base_url.trim_end_matches('/').to_string()),
            ..Self::default()
        }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// Top-level configuration for the gateway.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub upstream: UpstreamConfig,

    /// Events cache TTL, stale bound and miss coalescing.
    pub events_cache: CacheConfig,

    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins.
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            upstream: UpstreamConfig::default(),
            events_cache: CacheConfig::new()
                .with_ttl(Duration::from_millis(DEFAULT_EVENTS_CACHE_TTL_MS)),
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Besides the upstream variables:
    /// - `EVENTS_CACHE_TTL_MS`: events cache TTL (default: 30000)
    /// - `EVENTS_CACHE_MAX_STALE_MS`: oldest payload served on upstream failure
    ///   (default: unbounded)
    /// - `EVENTS_CACHE_COALESCE`: "true" to serialize concurrent misses
    /// - `PATROLX_CORS_ORIGINS`: comma-separated allowed origins (empty = allow all)
    /// - `PATROLX_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `PATROLX_CORS_MAX_AGE_SECS`: preflight cache duration (default: 86400)
    pub fn from_env() -> Self {
        let ttl_ms = env_parse_or("EVENTS_CACHE_TTL_MS", DEFAULT_EVENTS_CACHE_TTL_MS);
        let max_stale = env_first(&["EVENTS_CACHE_MAX_STALE_MS"]).and_then(|raw| {
            parse_value::<u64>("EVENTS_CACHE_MAX_STALE_MS", &raw)
                .map_err(|err| {
                    tracing::warn!(error = %err, "Invalid configuration value, stale fallback stays unbounded");
                })
                .ok()
                .map(Duration::from_millis)
        });

        let events_cache = CacheConfig::new()
            .with_ttl(Duration::from_millis(ttl_ms))
            .with_max_stale(max_stale)
            .with_coalescing(env_flag("EVENTS_CACHE_COALESCE"));

        let cors_origins = std::env::var("PATROLX_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            upstream: UpstreamConfig::from_env(),
            events_cache,
            cors_origins,
            cors_allow_credentials: env_flag("PATROLX_CORS_ALLOW_CREDENTIALS"),
            cors_max_age_secs: env_parse_or("PATROLX_CORS_MAX_AGE_SECS", 86400),
        }
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|allowed| allowed == origin)
    }
}

// ============================================================================
// INGEST CONFIGURATION
// ============================================================================

const DEFAULT_INGEST_BATCH_SIZE: usize = 20;
const DEFAULT_INGEST_INTERVAL_SECS: u64 = 900;

/// Settings for the batch sender that feeds collected messages to the CTR
/// Center ingest endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Full ingest URL. `None` when neither `INGEST_URL` nor a base URL is set.
    pub url: Option<String>,
    pub batch_size: usize,
    /// Pause between two batches.
    pub interval: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            url: None,
            batch_size: DEFAULT_INGEST_BATCH_SIZE,
            interval: Duration::from_secs(DEFAULT_INGEST_INTERVAL_SECS),
        }
    }
}

impl IngestConfig {
    /// Create IngestConfig from environment variables.
    ///
    /// - `INGEST_URL`: ingest endpoint (default: `{API_CTR_CENTER_URL}/messages`)
    /// - `INGEST_BATCH_SIZE`: messages per request (default: 20, zero is rejected)
    /// - `INGEST_BATCH_INTERVAL_SECS`: pause between batches (default: 900)
    pub fn from_env() -> Self {
        let url = env_first(&["INGEST_URL"]).or_else(|| {
            env_first(BASE_URL_VARS)
                .map(|base| format!("{}/messages", base.trim_end_matches('/')))
        });

        let batch_size = match env_parse_or("INGEST_BATCH_SIZE", DEFAULT_INGEST_BATCH_SIZE) {
            0 => {
                tracing::warn!(
                    default = DEFAULT_INGEST_BATCH_SIZE,
                    "INGEST_BATCH_SIZE must be positive, using default"
                );
                DEFAULT_INGEST_BATCH_SIZE
            }
            size => size,
        };

        Self {
            url,
            batch_size,
            interval: Duration::from_secs(env_parse_or(
                "INGEST_BATCH_INTERVAL_SECS",
                DEFAULT_INGEST_INTERVAL_SECS,
            )),
        }
    }
}
