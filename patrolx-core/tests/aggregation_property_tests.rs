//! Property tests for event extraction and zone aggregation.

use patrolx_core::{aggregate_events, extract_events, Event, GENERAL_ZONE};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

const LOCATIONS: &[&str] = &["Delmas", "Tabarre", "Carrefour", "Cité Soleil"];

fn arb_event_value() -> impl Strategy<Value = Value> {
    let location = prop_oneof![
        3 => prop::sample::select(LOCATIONS).prop_map(|l| Some(l.to_string())),
        1 => Just(None),
    ];
    let priority = prop_oneof![
        Just("urgent".to_string()),
        Just("high".to_string()),
        Just("medium".to_string()),
        Just("low".to_string()),
        "[a-z]{0,6}",
    ];

    (location, priority).prop_map(|(location, priority)| {
        let mut object = Map::new();
        if let Some(location) = location {
            object.insert("location".to_string(), Value::String(location));
        }
        object.insert("priority".to_string(), Value::String(priority));
        Value::Object(object)
    })
}

fn arb_events() -> impl Strategy<Value = Vec<Event>> {
    prop::collection::vec(arb_event_value(), 0..50)
        .prop_map(|values| values.iter().filter_map(Event::from_value).collect())
}

proptest! {
    #[test]
    fn prop_zone_counts_sum_to_global_counts(events in arb_events()) {
        let overview = aggregate_events(&events);

        let urgent: u64 = overview.zones.iter().map(|z| z.counts.urgent).sum();
        let pertinent: u64 = overview.zones.iter().map(|z| z.counts.pertinent).sum();
        let ignored: u64 = overview.zones.iter().map(|z| z.counts.ignored).sum();

        prop_assert_eq!(urgent, overview.status.urgent);
        prop_assert_eq!(pertinent, overview.status.pertinent);
        prop_assert_eq!(ignored, overview.status.ignored);
    }

    #[test]
    fn prop_global_total_counts_known_priorities(events in arb_events()) {
        let overview = aggregate_events(&events);
        let known = events.iter().filter(|e| e.category().is_some()).count() as u64;

        prop_assert_eq!(overview.status.total(), known);
        prop_assert_eq!(overview.event_count, events.len());
    }

    #[test]
    fn prop_zones_sorted_by_attention(events in arb_events()) {
        let overview = aggregate_events(&events);
        for pair in overview.zones.windows(2) {
            prop_assert!(pair[0].counts.attention() >= pair[1].counts.attention());
        }
    }

    #[test]
    fn prop_every_event_has_a_zone(events in arb_events()) {
        let overview = aggregate_events(&events);
        for event in &events {
            let name = event.location.as_deref().unwrap_or(GENERAL_ZONE);
            prop_assert!(overview.zones.iter().any(|z| z.name == name));
        }
    }

    #[test]
    fn prop_payload_shapes_extract_the_same_events(
        values in prop::collection::vec(arb_event_value(), 0..20),
    ) {
        let bare = extract_events(&Value::Array(values.clone()));
        let upper = extract_events(&json!({ "Events": values.clone() }));
        let lower = extract_events(&json!({ "events": values.clone() }));

        prop_assert_eq!(bare.len(), values.len());
        prop_assert_eq!(&bare, &upper);
        prop_assert_eq!(&bare, &lower);
    }

    #[test]
    fn prop_non_objects_are_skipped(
        values in prop::collection::vec(arb_event_value(), 0..10),
        noise in prop::collection::vec(any::<i64>().prop_map(|n| json!(n)), 0..5),
    ) {
        let mut mixed = values.clone();
        mixed.extend(noise);
        prop_assert_eq!(extract_events(&Value::Array(mixed)).len(), values.len());
    }
}
