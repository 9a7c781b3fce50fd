//! Chat REST API Routes
//!
//! Forwards a dashboard question to the CTR Center chat endpoint and flattens
//! the answer into `{response, prompt}`.

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
    routes::{is_truthy, json_body, required_str},
    state::AppState,
    upstream::CtrCenterClient,
};

const ASK_FAILURE: &str = "Failed to get response from chat API";

/// Answer used when upstream replied without any text.
pub const DEFAULT_ANSWER: &str = "Réponse reçue";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AskResponse {
    pub response: Value,
    pub prompt: String,
}

/// POST /api/ask - Ask the CTR Center assistant
pub async fn ask(
    State(upstream): State<Arc<CtrCenterClient>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<AskResponse>> {
    let body = json_body(payload);
    let prompt = required_str(&body, "prompt")
        .ok_or_else(|| ApiError::validation("Prompt is required and must be a non-empty string"))?
        .to_string();

    if !upstream.is_configured() {
        return Err(ApiError::not_configured());
    }

    let answer = upstream.chat(&prompt).await.map_err(|err| {
        let details = err
            .body_field("error")
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        ApiError::upstream_failure(ASK_FAILURE, &err).with_details(Value::String(details))
    })?;

    tracing::debug!(prompt_len = prompt.len(), "Chat answer received");
    Ok(Json(AskResponse {
        response: extract_answer(&answer),
        prompt,
    }))
}

/// First truthy of `answer`, `message` and `text`, else [`DEFAULT_ANSWER`].
pub fn extract_answer(body: &Value) -> Value {
    ["answer", "message", "text"]
        .iter()
        .filter_map(|key| body.get(*key))
        .find(|value| is_truthy(value))
        .cloned()
        .unwrap_or_else(|| Value::String(DEFAULT_ANSWER.to_string()))
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/ask", post(ask))
}
