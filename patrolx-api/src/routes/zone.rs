//! Zone REST API Routes

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use patrolx_core::{default_zone_summary, PriorityCounts};
use serde_json::{json, Map, Value};

use crate::{
    error::{ApiError, ApiResult},
    routes::is_truthy,
    state::AppState,
    upstream::CtrCenterClient,
};

const ZONE_FAILURE: &str = "Failed to fetch zone data from CTR Center API";

/// GET /api/zone/:name - Zone detail, normalized for the dashboard
pub async fn get_zone(
    State(upstream): State<Arc<CtrCenterClient>>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    if !upstream.is_configured() {
        return Err(ApiError::not_configured());
    }

    let payload = upstream
        .zone(&name)
        .await
        .map_err(|err| ApiError::upstream_failure(ZONE_FAILURE, &err))?;

    tracing::debug!(zone = %name, "Zone fetched from upstream");
    Ok(Json(normalize_zone_payload(&name, payload)))
}

/// Shape an upstream zone payload into `{zone, status, summary, ..}`.
///
/// - A falsy payload becomes an empty object
/// - Anything that is not an object is kept under `raw`
/// - `zone` always names the requested zone
/// - Falsy `status` and `summary` get their defaults
pub fn normalize_zone_payload(zone: &str, payload: Value) -> Value {
    let mut object = match payload {
        Value::Object(map) => map,
        other if !is_truthy(&other) => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("raw".to_string(), other);
            map
        }
    };

    object.insert("zone".to_string(), Value::String(zone.to_string()));

    if !object.get("status").is_some_and(is_truthy) {
        object.insert("status".to_string(), json!(PriorityCounts::default()));
    }
    if !object.get("summary").is_some_and(is_truthy) {
        object.insert(
            "summary".to_string(),
            Value::String(default_zone_summary(zone)),
        );
    }

    Value::Object(object)
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/zone/:name", get(get_zone))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_status() -> Value {
        json!({"urgent": 0, "pertinent": 0, "ignored": 0})
    }

    #[test]
    fn test_object_payload_keeps_fields() {
        let payload = json!({
            "zone": "Somewhere else",
            "status": {"urgent": 2, "pertinent": 0, "ignored": 1},
            "summary": "Calme",
            "extra": true,
        });
        let normalized = normalize_zone_payload("Delmas", payload);
        assert_eq!(normalized["zone"], json!("Delmas"));
        assert_eq!(normalized["status"]["urgent"], json!(2));
        assert_eq!(normalized["summary"], json!("Calme"));
        assert_eq!(normalized["extra"], json!(true));
    }

    #[test]
    fn test_defaults_fill_falsy_fields() {
        let normalized =
            normalize_zone_payload("Pétion-Ville", json!({"status": null, "summary": ""}));
        assert_eq!(normalized["status"], empty_status());
        assert_eq!(
            normalized["summary"],
            json!("État des lieux — Pétion-Ville\n📡 Aucune information disponible pour le moment.")
        );
    }

    #[test]
    fn test_scalars_and_arrays_are_wrapped() {
        let normalized = normalize_zone_payload("Delmas", json!("plain text"));
        assert_eq!(normalized["raw"], json!("plain text"));
        assert_eq!(normalized["zone"], json!("Delmas"));

        let normalized = normalize_zone_payload("Delmas", json!([1, 2]));
        assert_eq!(normalized["raw"], json!([1, 2]));
    }

    #[test]
    fn test_falsy_payload_becomes_empty_object() {
        for payload in [Value::Null, json!(""), json!(0), json!(false)] {
            let normalized = normalize_zone_payload("Delmas", payload);
            assert!(normalized.get("raw").is_none());
            assert_eq!(normalized["status"], empty_status());
        }
    }
}
