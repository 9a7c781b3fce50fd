//! Patrol-X Core - Shared Domain Types
//!
//! Types shared by the cache and the HTTP gateway:
//! - The upstream error taxonomy (`UpstreamError`)
//! - Incident events and their priorities
//! - Per-zone aggregation used by the dashboard overview

pub mod error;
pub mod event;
pub mod zone;

pub use error::{ConfigError, UpstreamError, UpstreamResult};
pub use event::{extract_events, Event, Priority, PriorityCategory};
pub use zone::{
    aggregate_events, default_zone_summary, EventsOverview, PriorityCounts, ZoneAggregate,
    CITY_NAME, GENERAL_ZONE, MAX_ATTENTION_ZONES,
};
