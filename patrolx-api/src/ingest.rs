//! Message ingest batch sender.
//!
//! Feeds messages collected from the community channel to the CTR Center
//! ingest endpoint. Messages are sent newest first, in `{messages: [...]}`
//! batches, with a pause between batches so the upstream analysis keeps up.
//! A failed batch is logged and skipped; the run carries on with the next.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDateTime;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::IngestConfig;

/// Timestamp layout inside the channel export's `timestamp` prefix.
pub const TIMESTAMP_FORMAT: &str = "%I:%M %p, %m/%d/%Y";

/// Export file read when no path is given.
pub const DEFAULT_MESSAGES_FILE: &str = "whatsapp_Infos_Partage.json";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Messages file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Expected a JSON array of messages in {path}")]
    NotAnArray { path: PathBuf },

    #[error("No ingest URL configured (set INGEST_URL or API_CTR_CENTER_URL)")]
    MissingUrl,

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Outcome of a full send run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendReport {
    pub batches_sent: usize,
    pub batches_failed: usize,
    pub messages_sent: usize,
}

// ============================================================================
// ORDERING AND BATCHING
// ============================================================================

/// Parse a channel timestamp such as `[1:25 PM, 11/24/2025] Infos Partage: `.
///
/// Anything that does not parse sorts as the oldest possible message.
pub fn parse_timestamp(raw: &str) -> NaiveDateTime {
    let cleaned = raw.replace('[', "");
    let stamp = cleaned.split(']').next().unwrap_or_default();
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).unwrap_or(NaiveDateTime::MIN)
}

fn message_time(message: &Value) -> NaiveDateTime {
    message
        .get("timestamp")
        .and_then(Value::as_str)
        .map(parse_timestamp)
        .unwrap_or(NaiveDateTime::MIN)
}

/// Sort newest first. Messages with equal timestamps keep their file order.
pub fn sort_newest_first(messages: &mut [Value]) {
    messages.sort_by_cached_key(|message| std::cmp::Reverse(message_time(message)));
}

/// Split `messages` into request bodies of at most `batch_size` messages.
pub fn batch_payloads(messages: &[Value], batch_size: usize) -> Vec<Value> {
    messages
        .chunks(batch_size.max(1))
        .map(|batch| json!({ "messages": batch }))
        .collect()
}

/// Load the channel export: a JSON array of message objects.
pub fn load_messages(path: &Path) -> Result<Vec<Value>, IngestError> {
    let raw = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            IngestError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            IngestError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    match serde_json::from_str(&raw) {
        Ok(Value::Array(messages)) => Ok(messages),
        Ok(_) => Err(IngestError::NotAnArray {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(IngestError::InvalidJson {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ============================================================================
// SENDER
// ============================================================================

/// Posts message batches to the ingest endpoint.
#[derive(Debug, Clone)]
pub struct BatchSender {
    http: Client,
    url: String,
    batch_size: usize,
    interval: Duration,
}

impl BatchSender {
    pub fn new(config: &IngestConfig) -> Result<Self, IngestError> {
        let url = config.url.clone().ok_or(IngestError::MissingUrl)?;
        let http = Client::builder()
            .build()
            .map_err(|e| IngestError::Client(e.to_string()))?;

        Ok(Self {
            http,
            url,
            batch_size: config.batch_size.max(1),
            interval: config.interval,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sort `messages` newest first and send them batch by batch.
    pub async fn send_all(&self, mut messages: Vec<Value>) -> SendReport {
        sort_newest_first(&mut messages);

        let total = messages.len();
        let payloads = batch_payloads(&messages, self.batch_size);
        let batch_count = payloads.len();
        tracing::info!(total, batch_count, url = %self.url, "Sending messages newest first");

        let mut report = SendReport::default();
        for (index, payload) in payloads.into_iter().enumerate() {
            let first = index * self.batch_size + 1;
            let last = total.min(first + self.batch_size - 1);
            let batch = index + 1;

            if self.send_batch(batch, first, last, &payload).await {
                report.batches_sent += 1;
                report.messages_sent += last + 1 - first;
            } else {
                report.batches_failed += 1;
            }

            if batch < batch_count && !self.interval.is_zero() {
                tracing::info!(
                    interval_secs = self.interval.as_secs(),
                    "Waiting before next batch"
                );
                tokio::time::sleep(self.interval).await;
            }
        }

        tracing::info!(
            sent = report.batches_sent,
            failed = report.batches_failed,
            "All messages sent"
        );
        report
    }

    async fn send_batch(&self, batch: usize, first: usize, last: usize, payload: &Value) -> bool {
        tracing::info!(batch, first, last, "Sending batch");

        let response = match self.http.post(&self.url).json(payload).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(batch, error = %err, "Error connecting to ingest endpoint");
                return false;
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::OK {
            tracing::info!(batch, response = %body, "Batch sent");
            true
        } else {
            tracing::warn!(batch, status = status.as_u16(), response = %body, "Batch rejected");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn message(timestamp: &str, text: &str) -> Value {
        json!({"timestamp": timestamp, "text": text})
    }

    fn texts(messages: &[Value]) -> Vec<&str> {
        messages.iter().map(|m| m["text"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_parse_channel_timestamp() {
        let parsed = parse_timestamp("[1:25 PM, 11/24/2025] Infos Partage: ");
        let expected = NaiveDate::from_ymd_opt(2025, 11, 24)
            .unwrap()
            .and_hms_opt(13, 25, 0)
            .unwrap();
        assert_eq!(parsed, expected);

        let morning = parse_timestamp("[09:05 AM, 01/02/2026] Infos Partage: ");
        assert_eq!(
            morning,
            NaiveDate::from_ymd_opt(2026, 1, 2).unwrap().and_hms_opt(9, 5, 0).unwrap()
        );
    }

    #[test]
    fn test_unparseable_timestamp_is_oldest() {
        assert_eq!(parse_timestamp("yesterday"), NaiveDateTime::MIN);
        assert_eq!(parse_timestamp(""), NaiveDateTime::MIN);
        assert_eq!(message_time(&json!({"text": "no stamp"})), NaiveDateTime::MIN);
    }

    #[test]
    fn test_sort_newest_first_is_stable() {
        let mut messages = vec![
            message("[1:25 PM, 11/24/2025] Infos Partage: ", "afternoon"),
            message("garbage", "broken-1"),
            message("[9:00 AM, 11/25/2025] Infos Partage: ", "next day"),
            message("[11:59 PM, 11/24/2025] Infos Partage: ", "late"),
            message("[1:25 PM, 11/24/2025] Infos Partage: ", "afternoon-dup"),
            message("", "broken-2"),
        ];
        sort_newest_first(&mut messages);
        assert_eq!(
            texts(&messages),
            vec!["next day", "late", "afternoon", "afternoon-dup", "broken-1", "broken-2"]
        );
    }

    #[test]
    fn test_batch_boundaries() {
        let messages: Vec<Value> = (0..45).map(|i| json!({"text": i})).collect();
        let payloads = batch_payloads(&messages, 20);
        let sizes: Vec<usize> = payloads
            .iter()
            .map(|p| p["messages"].as_array().unwrap().len())
            .collect();
        assert_eq!(sizes, vec![20, 20, 5]);
        assert_eq!(payloads[1]["messages"][0], json!({"text": 20}));

        let exact: Vec<Value> = (0..40).map(|i| json!(i)).collect();
        assert_eq!(batch_payloads(&exact, 20).len(), 2);

        assert!(batch_payloads(&[], 20).is_empty());
        assert_eq!(batch_payloads(&exact[..3], 0).len(), 3);
    }

    #[test]
    fn test_sender_requires_url() {
        let err = BatchSender::new(&IngestConfig::default()).unwrap_err();
        assert!(matches!(err, IngestError::MissingUrl));
    }

    #[test]
    fn test_load_messages_errors() {
        let dir = std::env::temp_dir().join(format!("patrolx-ingest-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let missing = dir.join("missing.json");
        assert!(matches!(
            load_messages(&missing),
            Err(IngestError::NotFound { .. })
        ));

        let object = dir.join("object.json");
        std::fs::write(&object, r#"{"messages": []}"#).unwrap();
        assert!(matches!(
            load_messages(&object),
            Err(IngestError::NotAnArray { .. })
        ));

        let broken = dir.join("broken.json");
        std::fs::write(&broken, "[{").unwrap();
        assert!(matches!(
            load_messages(&broken),
            Err(IngestError::InvalidJson { .. })
        ));

        let good = dir.join("good.json");
        std::fs::write(&good, r#"[{"timestamp": "x", "text": "a"}]"#).unwrap();
        assert_eq!(load_messages(&good).unwrap().len(), 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
