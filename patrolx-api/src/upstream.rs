//! CTR Center HTTP client.
//!
//! One `reqwest::Client` shared by every route. Each call resolves to the
//! decoded JSON body or an [`UpstreamError`]; translating that error into a
//! response is the route layer's job.

use std::time::Instant;

use async_trait::async_trait;
use patrolx_core::{UpstreamError, UpstreamResult};
use patrolx_storage::PayloadFetcher;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Url};
use serde_json::{json, Value};

use crate::config::{UpstreamConfig, BASE_URL_VARS};
use crate::telemetry::METRICS;

/// Query for the notification list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationQuery {
    pub unread_only: bool,
    pub limit: i64,
}

/// Client for the CTR Center API.
#[derive(Clone)]
pub struct CtrCenterClient {
    http: Client,
    config: UpstreamConfig,
}

impl CtrCenterClient {
    pub fn new(config: UpstreamConfig) -> UpstreamResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| UpstreamError::InvalidRequest {
                reason: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// GET `{base}{events_endpoint}`
    pub async fn latest_events(&self) -> UpstreamResult<Value> {
        let url = self.url(&self.config.events_endpoint)?;
        self.send("latest_events", self.http.get(url)).await
    }

    /// GET `{base}{location_endpoint}/{zone}`
    pub async fn zone(&self, zone: &str) -> UpstreamResult<Value> {
        let url = self.url_with_segments(&self.config.location_endpoint, &[zone])?;
        self.send("zone", self.http.get(url)).await
    }

    /// POST `{base}{chat_endpoint}` with `{prompt}`
    pub async fn chat(&self, prompt: &str) -> UpstreamResult<Value> {
        let url = self.url(&self.config.chat_endpoint)?;
        let request = self.http.post(url).json(&json!({ "prompt": prompt }));
        self.send("chat", request).await
    }

    /// POST `{base}/auth/signin`
    pub async fn sign_in(&self, username: &str, password: &str) -> UpstreamResult<Value> {
        let url = self.url("/auth/signin")?;
        let request = self.http.post(url).json(&json!({
            "username": username,
            "password": password,
        }));
        self.send("sign_in", request).await
    }

    /// POST `{base}/auth/signup`
    pub async fn sign_up(&self, username: &str, email: &str, password: &str) -> UpstreamResult<Value> {
        let url = self.url("/auth/signup")?;
        let request = self.http.post(url).json(&json!({
            "username": username,
            "email": email,
            "password": password,
        }));
        self.send("sign_up", request).await
    }

    /// GET `{base}/notifications?unread_only=..&limit=..`
    pub async fn notifications(
        &self,
        query: NotificationQuery,
        authorization: Option<&str>,
    ) -> UpstreamResult<Value> {
        let mut url = self.url("/notifications")?;
        url.query_pairs_mut()
            .append_pair("unread_only", if query.unread_only { "true" } else { "false" })
            .append_pair("limit", &query.limit.to_string());
        let request = with_authorization(self.http.get(url), authorization);
        self.send("notifications", request).await
    }

    /// POST `{base}/notifications/{id}/read`
    pub async fn mark_notification_read(
        &self,
        notification_id: &str,
        authorization: Option<&str>,
    ) -> UpstreamResult<Value> {
        let url = self.url_with_segments("/notifications", &[notification_id, "read"])?;
        let request = with_authorization(self.http.post(url).json(&json!({})), authorization);
        self.send("mark_notification_read", request).await
    }

    /// POST `{base}/notifications/read-all`
    pub async fn mark_all_notifications_read(
        &self,
        authorization: Option<&str>,
    ) -> UpstreamResult<Value> {
        let url = self.url("/notifications/read-all")?;
        let request = with_authorization(self.http.post(url).json(&json!({})), authorization);
        self.send("mark_all_notifications_read", request).await
    }

    // ========================================================================
    // Plumbing
    // ========================================================================

    fn url(&self, path: &str) -> UpstreamResult<Url> {
        let base = self
            .config
            .base_url
            .as_deref()
            .ok_or_else(|| UpstreamError::not_configured(BASE_URL_VARS[0]))?;
        let raw = format!("{}{}", base, path);
        Url::parse(&raw).map_err(|e| UpstreamError::InvalidRequest {
            reason: format!("Invalid upstream URL {}: {}", raw, e),
        })
    }

    /// `path` followed by `segments`, each percent-encoded as one segment.
    fn url_with_segments(&self, path: &str, segments: &[&str]) -> UpstreamResult<Url> {
        let mut url = self.url(path)?;
        url.path_segments_mut()
            .map_err(|_| UpstreamError::InvalidRequest {
                reason: "Upstream base URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, operation: &'static str, request: RequestBuilder) -> UpstreamResult<Value> {
        let start = Instant::now();
        let result = self.execute(request).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let outcome = outcome_label(&result);
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_upstream_request(operation, outcome);
        }

        match &result {
            Ok(_) => tracing::debug!(operation, elapsed_ms, "Upstream call succeeded"),
            Err(err) => tracing::warn!(operation, outcome, elapsed_ms, error = %err, "Upstream call failed"),
        }

        result
    }

    async fn execute(&self, request: RequestBuilder) -> UpstreamResult<Value> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let bytes = response.bytes().await;

        if status.is_success() {
            // A body that stalls or drops is a transport failure, not a bad payload.
            let bytes = bytes.map_err(map_transport_error)?;
            Ok(decode_body(&bytes))
        } else {
            let body = bytes
                .ok()
                .map(|bytes| decode_body(&bytes))
                .filter(|body| !body.is_null());
            Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

impl std::fmt::Debug for CtrCenterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CtrCenterClient")
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.timeout)
            .finish()
    }
}

#[async_trait]
impl PayloadFetcher<Value> for CtrCenterClient {
    async fn fetch(&self) -> UpstreamResult<Value> {
        self.latest_events().await
    }
}

fn with_authorization(request: RequestBuilder, authorization: Option<&str>) -> RequestBuilder {
    match authorization {
        Some(value) => request.header(AUTHORIZATION, value),
        None => request,
    }
}

fn map_transport_error(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout
    } else if err.is_builder() {
        UpstreamError::InvalidRequest {
            reason: err.to_string(),
        }
    } else {
        UpstreamError::unreachable(err.to_string())
    }
}

/// JSON when the body parses, a JSON string otherwise, `null` when empty.
pub(crate) fn decode_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

fn outcome_label(result: &UpstreamResult<Value>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(UpstreamError::Status { .. }) => "http_error",
        Err(UpstreamError::Timeout) => "timeout",
        Err(err) if err.is_network_failure() => "unreachable",
        Err(_) => "invalid",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> CtrCenterClient {
        CtrCenterClient::new(UpstreamConfig::with_base_url(base)).unwrap()
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(b""), Value::Null);
        assert_eq!(decode_body(b"  \n"), Value::Null);
        assert_eq!(decode_body(br#"{"a":1}"#), json!({"a": 1}));
        assert_eq!(decode_body(b"Bad Gateway"), json!("Bad Gateway"));
    }

    #[test]
    fn test_decode_body_keeps_key_order() {
        let body = decode_body(br#"{"zeta":1,"alpha":{"y":2,"b":3}}"#);
        assert_eq!(body.to_string(), r#"{"zeta":1,"alpha":{"y":2,"b":3}}"#);
    }

    #[test]
    fn test_zone_names_are_single_segments() {
        let client = client("https://ctr.example");
        let url = client
            .url_with_segments("/location", &["Cité Soleil/../admin"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://ctr.example/location/Cit%C3%A9%20Soleil%2F..%2Fadmin"
        );
    }

    #[test]
    fn test_notification_read_path() {
        let client = client("https://ctr.example/api/");
        let url = client
            .url_with_segments("/notifications", &["n-42", "read"])
            .unwrap();
        assert_eq!(url.as_str(), "https://ctr.example/api/notifications/n-42/read");
    }

    #[test]
    fn test_unconfigured_client_reports_missing_base() {
        let client = CtrCenterClient::new(UpstreamConfig::default()).unwrap();
        assert_eq!(
            client.url("/events/latest").unwrap_err(),
            UpstreamError::not_configured("API_CTR_CENTER_URL")
        );
    }

    #[test]
    fn test_invalid_base_url_is_local_error() {
        let client = client("not a url");
        let err = client.url("/chat").unwrap_err();
        assert!(err.is_local());
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome_label(&Ok(Value::Null)), "success");
        assert_eq!(outcome_label(&Err(UpstreamError::Timeout)), "timeout");
        assert_eq!(
            outcome_label(&Err(UpstreamError::unreachable("refused"))),
            "unreachable"
        );
        assert_eq!(
            outcome_label(&Err(UpstreamError::Status {
                status: 500,
                body: None
            })),
            "http_error"
        );
    }
}
