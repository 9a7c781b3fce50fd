//! Auth REST API Routes
//!
//! Sign-in and sign-up are delegated entirely to the CTR Center. The gateway
//! checks that the fields are present and relays the token it gets back.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;

use crate::{
    error::{ApiError, ApiResult},
    routes::{json_body, required_str},
    state::AppState,
    upstream::CtrCenterClient,
};

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthResponse {
    pub status: &'static str,
    pub message: &'static str,
    /// Absent when upstream answered without one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<Value>,
}

impl AuthResponse {
    fn ok(message: &'static str, upstream_body: &Value) -> Self {
        Self {
            status: "ok",
            message,
            token: upstream_body.get("token").filter(|t| !t.is_null()).cloned(),
        }
    }
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/login - Sign in against the CTR Center
pub async fn login(
    State(upstream): State<Arc<CtrCenterClient>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let body = json_body(payload);
    let (Some(username), Some(password)) =
        (required_str(&body, "username"), required_str(&body, "password"))
    else {
        return Err(
            ApiError::validation("Username and password are required").in_status_envelope()
        );
    };

    if !upstream.is_configured() {
        return Err(ApiError::not_configured());
    }

    let response = upstream
        .sign_in(username, password)
        .await
        .map_err(|err| ApiError::upstream_auth_failure(&err))?;

    tracing::info!(username, "Login successful");
    Ok(Json(AuthResponse::ok("Login successful", &response)))
}

/// POST /api/signup - Create an account on the CTR Center
pub async fn signup(
    State(upstream): State<Arc<CtrCenterClient>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let body = json_body(payload);
    let (Some(username), Some(email), Some(password)) = (
        required_str(&body, "username"),
        required_str(&body, "email"),
        required_str(&body, "password"),
    ) else {
        return Err(
            ApiError::validation("Username, email and password are required")
                .in_status_envelope(),
        );
    };

    if !upstream.is_configured() {
        return Err(ApiError::not_configured());
    }

    let response = upstream
        .sign_up(username, email, password)
        .await
        .map_err(|err| ApiError::upstream_auth_failure(&err))?;

    tracing::info!(username, "Signup successful");
    Ok(Json(AuthResponse::ok("Signup successful", &response)))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/signup", post(signup))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_auth_response_relays_token() {
        let response = AuthResponse::ok("Login successful", &json!({"token": "abc", "user": {}}));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"status": "ok", "message": "Login successful", "token": "abc"})
        );
    }

    #[test]
    fn test_auth_response_omits_missing_token() {
        let response = AuthResponse::ok("Signup successful", &json!({"token": null}));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"status": "ok", "message": "Signup successful"})
        );
    }
}
