//! Per-zone aggregation of incident events.
//!
//! Aggregates are derived views: they are recomputed from the raw event list
//! on every read and never stored.

use std::cmp::Reverse;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::event::{Event, PriorityCategory};

/// Zone name used for events that carry no location.
pub const GENERAL_ZONE: &str = "Général";

/// City the dashboard covers.
pub const CITY_NAME: &str = "Port-au-Prince";

/// How many zones with urgent incidents the summary calls out.
pub const MAX_ATTENTION_ZONES: usize = 3;

/// Event counts per display category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriorityCounts {
    pub urgent: u64,
    pub pertinent: u64,
    pub ignored: u64,
}

impl PriorityCounts {
    pub fn record(&mut self, category: PriorityCategory) {
        match category {
            PriorityCategory::Urgent => self.urgent += 1,
            PriorityCategory::Pertinent => self.pertinent += 1,
            PriorityCategory::Ignored => self.ignored += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.urgent + self.pertinent + self.ignored
    }

    /// Incidents that need someone to look at them.
    pub fn attention(&self) -> u64 {
        self.urgent + self.pertinent
    }
}

/// Counts for one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneAggregate {
    pub name: String,
    #[serde(flatten)]
    pub counts: PriorityCounts,
}

/// City-wide view over a list of events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsOverview {
    pub status: PriorityCounts,
    pub summary: String,
    /// Sorted by `urgent + pertinent`, descending. Ties keep first-seen order.
    pub zones: Vec<ZoneAggregate>,
    pub event_count: usize,
}

/// Group events by location and count them per category.
pub fn aggregate_events(events: &[Event]) -> EventsOverview {
    let mut status = PriorityCounts::default();
    let mut zones: Vec<ZoneAggregate> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for event in events {
        let name = event.location.as_deref().unwrap_or(GENERAL_ZONE);
        let slot = *index.entry(name.to_string()).or_insert_with(|| {
            zones.push(ZoneAggregate {
                name: name.to_string(),
                counts: PriorityCounts::default(),
            });
            zones.len() - 1
        });

        if let Some(category) = event.category() {
            status.record(category);
            zones[slot].counts.record(category);
        }
    }

    // sort_by_key is stable
    zones.sort_by_key(|zone| Reverse(zone.counts.attention()));

    let summary = if events.is_empty() {
        empty_summary()
    } else {
        render_summary(&status, &zones)
    };

    EventsOverview {
        status,
        summary,
        zones,
        event_count: events.len(),
    }
}

/// Summary shown for a zone the upstream knows nothing about.
pub fn default_zone_summary(zone: &str) -> String {
    format!("État des lieux — {zone}\n📡 Aucune information disponible pour le moment.")
}

fn empty_summary() -> String {
    format!(
        "📊 **État des lieux général — {CITY_NAME}**\n\n🏛️ **Aucune information disponible pour le moment**"
    )
}

fn plural(count: u64, word: &str) -> String {
    if count > 1 {
        format!("{word}s")
    } else {
        word.to_string()
    }
}

fn render_summary(status: &PriorityCounts, zones: &[ZoneAggregate]) -> String {
    let zone_count = zones.len() as u64;
    let mut lines = vec![
        format!("📊 **État des lieux général — {CITY_NAME}**"),
        String::new(),
        format!(
            "🏛️ **{zone_count} {} {}**",
            plural(zone_count, "zone"),
            plural(zone_count, "surveillée")
        ),
        format!(
            "🔥 **{} {} {}** {}",
            status.urgent,
            plural(status.urgent, "incident"),
            plural(status.urgent, "urgent"),
            plural(status.urgent, "signalé")
        ),
        format!(
            "📌 **{} {} {}** en cours",
            status.pertinent,
            plural(status.pertinent, "incident"),
            plural(status.pertinent, "pertinent")
        ),
        format!(
            "💤 **{} {} {}**",
            status.ignored,
            plural(status.ignored, "incident"),
            plural(status.ignored, "ignoré")
        ),
    ];

    let attention: Vec<String> = zones
        .iter()
        .filter(|zone| zone.counts.urgent > 0)
        .take(MAX_ATTENTION_ZONES)
        .map(|zone| {
            format!(
                "{} ({} {})",
                zone.name,
                zone.counts.urgent,
                plural(zone.counts.urgent, "urgent")
            )
        })
        .collect();

    if !attention.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "⚠️ **Zones nécessitant attention** : {}",
            attention.join(", ")
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::extract_events;
    use serde_json::json;

    fn events(value: serde_json::Value) -> Vec<Event> {
        extract_events(&value)
    }

    #[test]
    fn test_aggregate_counts_by_zone() {
        let list = events(json!([
            {"location": "Delmas", "priority": "urgent"},
            {"location": "Delmas", "priority": "high"},
            {"location": "Tabarre", "priority": "low"},
            {"location": "Delmas", "priority": "medium"},
            {"priority": "urgent"},
        ]));
        let overview = aggregate_events(&list);

        assert_eq!(
            overview.status,
            PriorityCounts {
                urgent: 2,
                pertinent: 2,
                ignored: 1
            }
        );
        assert_eq!(overview.event_count, 5);
        assert_eq!(overview.zones.len(), 3);
        assert_eq!(overview.zones[0].name, "Delmas");
        assert_eq!(overview.zones[0].counts.urgent, 1);
        assert_eq!(overview.zones[0].counts.pertinent, 2);
        assert_eq!(overview.zones[1].name, GENERAL_ZONE);
        assert_eq!(overview.zones[2].name, "Tabarre");
    }

    #[test]
    fn test_unknown_priority_creates_empty_zone() {
        let list = events(json!([{"location": "Carrefour", "priority": "whatever"}]));
        let overview = aggregate_events(&list);

        assert_eq!(overview.status.total(), 0);
        assert_eq!(overview.zones.len(), 1);
        assert_eq!(overview.zones[0].counts, PriorityCounts::default());
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let list = events(json!([
            {"location": "B", "priority": "low"},
            {"location": "A", "priority": "low"},
            {"location": "C", "priority": "high"},
        ]));
        let names: Vec<_> = aggregate_events(&list)
            .zones
            .into_iter()
            .map(|z| z.name)
            .collect();
        assert_eq!(names, vec!["C", "B", "A"]);
    }

    #[test]
    fn test_summary_mentions_attention_zones() {
        let list = events(json!([
            {"location": "Delmas", "priority": "urgent"},
            {"location": "Delmas", "priority": "urgent"},
            {"location": "Cité Soleil", "priority": "urgent"},
            {"location": "Tabarre", "priority": "low"},
        ]));
        let summary = aggregate_events(&list).summary;

        assert!(summary.contains("3 zones surveillées"));
        assert!(summary.contains("3 incidents urgents"));
        assert!(summary.contains("Delmas (2 urgents)"));
        assert!(summary.contains("Cité Soleil (1 urgent)"));
        assert!(!summary.contains("Tabarre ("));
    }

    #[test]
    fn test_summary_caps_attention_zones() {
        let list = events(json!([
            {"location": "A", "priority": "urgent"},
            {"location": "B", "priority": "urgent"},
            {"location": "C", "priority": "urgent"},
            {"location": "D", "priority": "urgent"},
        ]));
        let summary = aggregate_events(&list).summary;
        assert!(summary.contains("A (1 urgent), B (1 urgent), C (1 urgent)"));
        assert!(!summary.contains("D (1 urgent)"));
    }

    #[test]
    fn test_empty_events_summary() {
        let overview = aggregate_events(&[]);
        assert_eq!(overview.status, PriorityCounts::default());
        assert!(overview.zones.is_empty());
        assert!(overview.summary.contains("Aucune information disponible"));
    }

    #[test]
    fn test_zone_serialization_is_flat() {
        let zone = ZoneAggregate {
            name: "Delmas".to_string(),
            counts: PriorityCounts {
                urgent: 1,
                pertinent: 0,
                ignored: 2,
            },
        };
        let value = serde_json::to_value(&zone).unwrap();
        assert_eq!(
            value,
            json!({"name": "Delmas", "urgent": 1, "pertinent": 0, "ignored": 2})
        );
    }

    #[test]
    fn test_default_zone_summary() {
        let summary = default_zone_summary("Tabarre");
        assert!(summary.starts_with("État des lieux — Tabarre"));
    }
}
