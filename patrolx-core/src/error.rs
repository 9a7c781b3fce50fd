//! Error types for Patrol-X operations

use serde_json::Value;
use thiserror::Error;

/// Failure of a single call to the CTR Center API.
///
/// Every upstream call resolves to either a decoded body or one of these
/// variants. The HTTP layer translates them into client-facing envelopes in
/// exactly one place.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum UpstreamError {
    #[error("Upstream not configured: {field} is not set")]
    NotConfigured { field: String },

    #[error("Upstream responded with status {status}")]
    Status { status: u16, body: Option<Value> },

    #[error("Upstream unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("Upstream request timed out")]
    Timeout,

    #[error("Invalid upstream request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Invalid upstream response: {reason}")]
    InvalidResponse { reason: String },
}

impl UpstreamError {
    pub fn not_configured(field: impl Into<String>) -> Self {
        Self::NotConfigured {
            field: field.into(),
        }
    }

    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self::Unreachable {
            reason: reason.into(),
        }
    }

    /// HTTP status reported by the upstream, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Body returned alongside an error status.
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Status { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// String field of the error body (`message`, `error`, ...).
    pub fn body_field(&self, key: &str) -> Option<&str> {
        self.body()
            .and_then(|body| body.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// No response was received: connection refused, DNS failure, timeout.
    pub fn is_network_failure(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::Timeout)
    }

    /// The failure happened before anything was sent upstream.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::NotConfigured { .. } | Self::InvalidRequest { .. })
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Result type alias for upstream calls.
pub type UpstreamResult<T> = Result<T, UpstreamError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_only_for_responded_errors() {
        let err = UpstreamError::Status {
            status: 404,
            body: None,
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(UpstreamError::Timeout.status(), None);
        assert_eq!(UpstreamError::unreachable("refused").status(), None);
    }

    #[test]
    fn test_body_field_lookup() {
        let err = UpstreamError::Status {
            status: 401,
            body: Some(json!({"message": "Bad credentials", "error": ""})),
        };
        assert_eq!(err.body_field("message"), Some("Bad credentials"));
        assert_eq!(err.body_field("error"), None);
        assert_eq!(err.body_field("missing"), None);
    }

    #[test]
    fn test_failure_classes() {
        assert!(UpstreamError::Timeout.is_network_failure());
        assert!(UpstreamError::unreachable("dns").is_network_failure());
        assert!(!UpstreamError::not_configured("API_CTR_CENTER_URL").is_network_failure());
        assert!(UpstreamError::not_configured("API_CTR_CENTER_URL").is_local());
        assert!(!UpstreamError::Timeout.is_local());
    }

    #[test]
    fn test_display_messages() {
        let msg = UpstreamError::not_configured("API_CTR_CENTER_URL").to_string();
        assert!(msg.contains("API_CTR_CENTER_URL"));

        let msg = UpstreamError::Status {
            status: 502,
            body: None,
        }
        .to_string();
        assert!(msg.contains("502"));

        let err = ConfigError::InvalidValue {
            field: "PORT".to_string(),
            value: "abc".to_string(),
            reason: "not a port number".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("PORT"));
        assert!(msg.contains("abc"));
    }
}
