//! Error Types for the Patrol-X API
//!
//! This module defines error handling for the HTTP layer:
//! - ErrorCode enum for categorizing errors
//! - ApiError struct carrying code, message, details and wire envelope
//! - Translation from `UpstreamError` into client-facing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! Two JSON envelopes exist because the dashboard reads two shapes:
//! the *detail* envelope `{error, details?}` and the *status* envelope
//! `{status: "error", message, details?, code?}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use patrolx_core::UpstreamError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Message returned whenever the upstream base URL is missing.
pub const NOT_CONFIGURED_MESSAGE: &str = "API_CTR_CENTER_URL is not configured on the server";

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The upstream base URL is not set
    ConfigurationMissing,

    /// Upstream answered with a non-success status
    UpstreamHttpError,

    /// Upstream could not be reached or timed out
    UpstreamUnreachable,

    /// Client input failed validation
    ValidationError,

    /// Upstream rejected the forwarded credentials
    Unauthorized,

    /// Upstream reported the resource missing
    NotFound,

    /// Anything else that went wrong locally
    InternalError,
}

impl ErrorCode {
    /// Default HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::UpstreamHttpError => StatusCode::BAD_GATEWAY,
            ErrorCode::UpstreamUnreachable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::ConfigurationMissing | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Wire name, as used in the `code` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigurationMissing => "CONFIGURATION_MISSING",
            ErrorCode::UpstreamHttpError => "UPSTREAM_HTTP_ERROR",
            ErrorCode::UpstreamUnreachable => "UPSTREAM_UNREACHABLE",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// JSON shape an error is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Envelope {
    /// `{error, details?}`
    #[default]
    Detail,
    /// `{status: "error", message, details?, code?}`
    Status,
}

/// Which notification mutation failed; decides whether 404 is special.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
    MarkRead,
    MarkAllRead,
}

impl NotificationAction {
    fn fallback_message(&self) -> &'static str {
        match self {
            NotificationAction::MarkRead => "Failed to mark notification as read",
            NotificationAction::MarkAllRead => "Failed to mark notifications as read",
        }
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error returned by every route.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (upstream body, error text)
    pub details: Option<Value>,

    /// Wire shape of the response body
    pub envelope: Envelope,

    /// Status that overrides the code's default, e.g. a passed-through
    /// upstream status
    pub status: Option<StatusCode>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            envelope: Envelope::Detail,
            status: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Render in the status envelope.
    pub fn in_status_envelope(mut self) -> Self {
        self.envelope = Envelope::Status;
        self
    }

    /// Override the HTTP status. Invalid codes keep the code's default.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = StatusCode::from_u16(status).ok();
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.status.unwrap_or_else(|| self.code.status_code())
    }

    /// JSON body for this error.
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        match self.envelope {
            Envelope::Detail => {
                body.insert("error".to_string(), Value::String(self.message.clone()));
                if let Some(details) = &self.details {
                    body.insert("details".to_string(), details.clone());
                }
            }
            Envelope::Status => {
                body.insert("status".to_string(), json!("error"));
                body.insert("message".to_string(), Value::String(self.message.clone()));
                if let Some(details) = &self.details {
                    body.insert("details".to_string(), details.clone());
                }
                if self.code == ErrorCode::Unauthorized {
                    body.insert("code".to_string(), json!(self.code.as_str()));
                }
            }
        }
        Value::Object(body)
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    /// The upstream base URL is missing.
    pub fn not_configured() -> Self {
        Self::new(ErrorCode::ConfigurationMissing, NOT_CONFIGURED_MESSAGE)
    }

    /// Create a ValidationError.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// Create an Unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Create a NotFound error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create an InternalError.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    // ========================================================================
    // Upstream translation
    // ========================================================================

    /// Failure of a read-style proxy route (events, zone, chat, notification
    /// list). Rendered in the detail envelope with the upstream status passed
    /// through, or 500 when upstream never answered.
    pub fn upstream_failure(context: &str, err: &UpstreamError) -> Self {
        let code = match err {
            UpstreamError::NotConfigured { .. } => return Self::not_configured(),
            UpstreamError::Status { .. } => ErrorCode::UpstreamHttpError,
            UpstreamError::Unreachable { .. } | UpstreamError::Timeout => {
                ErrorCode::UpstreamUnreachable
            }
            UpstreamError::InvalidRequest { .. } | UpstreamError::InvalidResponse { .. } => {
                ErrorCode::InternalError
            }
        };

        Self::new(code, context)
            .with_details(Value::String(err.to_string()))
            .with_status(err.status().unwrap_or(500))
    }

    /// Failure of sign-in or sign-up, in the status envelope.
    pub fn upstream_auth_failure(err: &UpstreamError) -> Self {
        match err {
            UpstreamError::NotConfigured { .. } => Self::not_configured(),
            UpstreamError::Status { status, body } => {
                let message = err.body_field("message").unwrap_or("Authentication failed");
                let mut error = Self::new(ErrorCode::UpstreamHttpError, message)
                    .in_status_envelope()
                    .with_status(*status);
                if let Some(body) = body {
                    error = error.with_details(body.clone());
                }
                error
            }
            UpstreamError::Unreachable { .. } | UpstreamError::Timeout => {
                Self::new(ErrorCode::UpstreamUnreachable, "Authentication service unavailable")
                    .in_status_envelope()
                    .with_details(json!("Could not connect to authentication server"))
            }
            UpstreamError::InvalidRequest { .. } | UpstreamError::InvalidResponse { .. } => {
                Self::internal_error("Internal server error")
                    .in_status_envelope()
                    .with_details(Value::String(err.to_string()))
            }
        }
    }

    /// Failure of a notification mutation, in the status envelope.
    pub fn notification_failure(action: NotificationAction, err: &UpstreamError) -> Self {
        match err {
            UpstreamError::NotConfigured { .. } => Self::not_configured(),
            UpstreamError::Status { status: 401, .. } => {
                Self::unauthorized("Unauthorized. Please sign in.").in_status_envelope()
            }
            UpstreamError::Status { status: 404, .. }
                if action == NotificationAction::MarkRead =>
            {
                Self::not_found("Notification not found").in_status_envelope()
            }
            UpstreamError::Status { status, .. } => {
                let message = err
                    .body_field("message")
                    .or_else(|| err.body_field("error"))
                    .unwrap_or(action.fallback_message());
                Self::new(ErrorCode::UpstreamHttpError, message)
                    .in_status_envelope()
                    .with_status(*status)
            }
            UpstreamError::Unreachable { .. } | UpstreamError::Timeout => Self::new(
                ErrorCode::UpstreamUnreachable,
                "Could not connect to the server. Check your internet connection.",
            )
            .in_status_envelope()
            .with_status(500),
            UpstreamError::InvalidRequest { .. } | UpstreamError::InvalidResponse { .. } => {
                Self::internal_error(format!("{}. Please try again.", action.fallback_message()))
                    .in_status_envelope()
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = %self.code, status = status.as_u16(), message = %self.message, "Request failed");
        } else {
            tracing::debug!(code = %self.code, status = status.as_u16(), message = %self.message, "Request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM STANDARD ERRORS
// ============================================================================

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON serialization error: {:?}", err);
        ApiError::internal_error(format!("Invalid JSON: {}", err))
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
