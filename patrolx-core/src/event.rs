//! Incident events as published by the CTR Center.
//!
//! Events are upstream-owned and read-only here. Only `location` and
//! `priority` carry meaning for the gateway; every other field is kept
//! verbatim so it can be handed back to clients untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Upstream priority of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Urgent,
    High,
    Medium,
    Low,
    /// Anything the upstream sends that is not one of the four levels.
    #[default]
    #[serde(other)]
    Unknown,
}

impl Priority {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "urgent" => Self::Urgent,
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Unknown,
        }
    }

    /// Display category this priority is counted under, if any.
    pub fn category(&self) -> Option<PriorityCategory> {
        match self {
            Self::Urgent => Some(PriorityCategory::Urgent),
            Self::High | Self::Medium => Some(PriorityCategory::Pertinent),
            Self::Low => Some(PriorityCategory::Ignored),
            Self::Unknown => None,
        }
    }
}

/// The three buckets the dashboard groups events into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityCategory {
    Urgent,
    Pertinent,
    Ignored,
}

/// A single incident event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub location: Option<String>,
    pub priority: Priority,
    /// The full upstream object, including `location` and `priority`.
    pub fields: Map<String, Value>,
}

impl Event {
    /// Read an event out of an upstream JSON value.
    ///
    /// Returns `None` for anything that is not a JSON object. Missing or
    /// empty locations become `None`; non-string scalar locations are
    /// stringified.
    pub fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_object()?.clone();

        let location = match fields.get("location") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(true)) => Some("true".to_string()),
            _ => None,
        };

        let priority = fields
            .get("priority")
            .and_then(Value::as_str)
            .map(Priority::parse)
            .unwrap_or_default();

        Some(Self {
            location,
            priority,
            fields,
        })
    }

    pub fn category(&self) -> Option<PriorityCategory> {
        self.priority.category()
    }
}

/// Pull the event list out of an events payload.
///
/// The upstream has shipped three shapes over time: a bare array, or an
/// object holding the array under `Events` or `events`. Anything else is
/// treated as "no events".
pub fn extract_events(payload: &Value) -> Vec<Event> {
    let items: &[Value] = match payload {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => ["Events", "events"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    };

    items.iter().filter_map(Event::from_value).collect()
}
