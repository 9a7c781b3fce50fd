//! Patrol-X Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - A scripted [`PayloadFetcher`] for driving the events cache
//! - Proptest generators for events and upstream payloads
//! - Fixtures for common CTR Center responses
//! - Assertions over cache reads

pub use patrolx_core::{Event, Priority, PriorityCategory, UpstreamError, UpstreamResult};
pub use patrolx_storage::{CacheRead, CacheSource, PayloadFetcher};

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

// ============================================================================
// SCRIPTED FETCHER
// ============================================================================

/// Fetcher that replays a queue of canned upstream results.
///
/// Once the script runs out every call fails with `Unreachable`, which makes
/// an unexpected upstream call show up as an error instead of a hang.
#[derive(Debug)]
pub struct ScriptedFetcher<T> {
    script: Mutex<VecDeque<UpstreamResult<T>>>,
    calls: AtomicUsize,
}

impl<T> ScriptedFetcher<T> {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_script(results: impl IntoIterator<Item = UpstreamResult<T>>) -> Self {
        let fetcher = Self::new();
        for result in results {
            fetcher.push(result);
        }
        fetcher
    }

    pub fn push(&self, result: UpstreamResult<T>) {
        self.lock().push_back(result);
    }

    pub fn push_ok(&self, payload: T) {
        self.push(Ok(payload));
    }

    pub fn push_err(&self, error: UpstreamError) {
        self.push(Err(error));
    }

    /// Number of times `fetch` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<UpstreamResult<T>>> {
        self.script
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl<T: Send + Sync> PayloadFetcher<T> for ScriptedFetcher<T> {
    async fn fetch(&self) -> UpstreamResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.lock().pop_front();
        next.unwrap_or_else(|| Err(UpstreamError::unreachable("scripted fetcher exhausted")))
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for events and upstream payloads.

    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Map};

    /// Zone names seen in Port-au-Prince feeds.
    pub const ZONES: &[&str] = &[
        "Delmas",
        "Pétion-Ville",
        "Tabarre",
        "Carrefour",
        "Cité Soleil",
        "Croix-des-Bouquets",
    ];

    /// Generate a Priority, including `Unknown`.
    pub fn arb_priority() -> impl Strategy<Value = Priority> {
        prop_oneof![
            Just(Priority::Urgent),
            Just(Priority::High),
            Just(Priority::Medium),
            Just(Priority::Low),
            Just(Priority::Unknown),
        ]
    }

    /// Generate a raw priority string as upstream might send it.
    pub fn arb_priority_label() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("urgent".to_string()),
            Just("high".to_string()),
            Just("medium".to_string()),
            Just("low".to_string()),
            "[a-z]{0,8}",
        ]
    }

    /// Generate an optional location; `None` lands in the general zone.
    pub fn arb_location() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            3 => prop::sample::select(ZONES).prop_map(|zone| Some(zone.to_string())),
            1 => Just(None),
        ]
    }

    /// Generate one upstream event object.
    pub fn arb_event_value() -> impl Strategy<Value = Value> {
        (arb_location(), arb_priority_label(), "[A-Za-z ]{0,24}").prop_map(
            |(location, priority, title)| {
                let mut object = Map::new();
                if let Some(location) = location {
                    object.insert("location".to_string(), Value::String(location));
                }
                object.insert("priority".to_string(), Value::String(priority));
                object.insert("title".to_string(), Value::String(title));
                Value::Object(object)
            },
        )
    }

    /// Generate a parsed Event.
    pub fn arb_event() -> impl Strategy<Value = Event> {
        arb_event_value().prop_filter_map("event objects always parse", |value| {
            Event::from_value(&value)
        })
    }

    /// Generate a latest-events payload in any of the accepted shapes.
    pub fn arb_events_payload() -> impl Strategy<Value = Value> {
        prop::collection::vec(arb_event_value(), 0..40).prop_flat_map(|events| {
            prop_oneof![
                Just(Value::Array(events.clone())),
                Just(json!({ "Events": events.clone() })),
                Just(json!({ "events": events })),
            ]
        })
    }

    /// Generate an upstream failure of any kind.
    pub fn arb_upstream_error() -> impl Strategy<Value = UpstreamError> {
        prop_oneof![
            (400u16..600).prop_map(|status| UpstreamError::Status { status, body: None }),
            Just(UpstreamError::Timeout),
            "[a-z ]{1,20}".prop_map(|reason: String| UpstreamError::unreachable(reason)),
        ]
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Canned CTR Center payloads.

    use serde_json::{json, Value};

    /// A small latest-events payload touching three zones.
    ///
    /// Object keys are not in alphabetical order.
    pub fn latest_events() -> Value {
        json!({
            "Events": [
                {"id": 1, "title": "Barricade", "priority": "urgent", "location": "Delmas"},
                {"id": 2, "title": "Gunfire", "priority": "high", "location": "Delmas"},
                {"id": 3, "title": "Traffic", "priority": "low", "location": "Tabarre"},
                {"id": 4, "title": "Protest", "priority": "medium", "location": "Pétion-Ville"},
                {"id": 5, "title": "Unlocated alert", "priority": "urgent"}
            ]
        })
    }

    /// Zone payload with every field the dashboard reads.
    pub fn zone(name: &str) -> Value {
        json!({
            "zone": name,
            "status": {"urgent": 1, "pertinent": 2, "ignored": 0},
            "summary": format!("Situation tendue à {name}")
        })
    }

    /// Notification list as returned for an authenticated user.
    pub fn notifications() -> Value {
        json!({
            "notifications": [
                {"id": "n-1", "message": "Nouvel incident à Delmas", "read": false},
                {"id": "n-2", "message": "Route dégagée", "read": true}
            ],
            "unread_count": 1
        })
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over cache reads.

    use super::*;

    #[track_caller]
    pub fn assert_source<T: std::fmt::Debug>(read: &CacheRead<T>, expected: CacheSource) {
        assert_eq!(
            read.source(),
            expected,
            "expected a {expected} read, got {:?}",
            read
        );
    }
}
