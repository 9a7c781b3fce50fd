//! Property tests for the request/response shaping done by the routes.

use patrolx_api::routes::ask::{extract_answer, DEFAULT_ANSWER};
use patrolx_api::routes::notifications::{parse_limit, DEFAULT_NOTIFICATION_LIMIT};
use patrolx_api::routes::zone::normalize_zone_payload;
use patrolx_test_utils::generators::{arb_events_payload, ZONES};
use proptest::prelude::*;
use serde_json::{json, Value};

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        ".{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::hash_map("[a-z]{1,8}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

fn arb_zone_name() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(ZONES).prop_map(str::to_string),
        "[A-Za-z -]{1,16}",
    ]
}

proptest! {
    #[test]
    fn prop_normalized_zone_always_has_dashboard_fields(
        zone in arb_zone_name(),
        payload in prop_oneof![arb_json(), arb_events_payload()],
    ) {
        let normalized = normalize_zone_payload(&zone, payload);
        let object = normalized.as_object().expect("normalized payload is an object");

        prop_assert_eq!(object.get("zone"), Some(&Value::String(zone.clone())));
        prop_assert!(object.get("status").is_some_and(|s| !s.is_null()));
        prop_assert!(object
            .get("summary")
            .is_some_and(|s| s.as_str().map_or(true, |s| !s.is_empty())));
    }

    #[test]
    fn prop_object_fields_survive_normalization(
        zone in arb_zone_name(),
        key in "[a-z]{3,8}",
        value in arb_json(),
    ) {
        prop_assume!(!["zone", "status", "summary"].contains(&key.as_str()));
        let payload = json!({ (key.clone()): value.clone() });
        let normalized = normalize_zone_payload(&zone, payload);
        prop_assert_eq!(&normalized[key.as_str()], &value);
    }

    #[test]
    fn prop_limit_is_never_zero(raw in proptest::option::of(".{0,10}")) {
        prop_assert_ne!(parse_limit(raw.as_deref()), 0);
    }

    #[test]
    fn prop_numeric_limits_round_trip(limit in 1i64..100_000, suffix in "[a-z]{0,4}") {
        prop_assert_eq!(parse_limit(Some(&format!("{limit}{suffix}"))), limit);
    }

    #[test]
    fn prop_non_numeric_limits_default(raw in "[a-z ]{0,10}") {
        prop_assert_eq!(parse_limit(Some(&raw)), DEFAULT_NOTIFICATION_LIMIT);
    }

    #[test]
    fn prop_answer_is_never_falsy(body in arb_json()) {
        let answer = extract_answer(&body);
        prop_assert!(!answer.is_null());
        prop_assert_ne!(&answer, &json!(""));
        if !body.is_object() {
            prop_assert_eq!(answer, json!(DEFAULT_ANSWER));
        }
    }
}
