//! Message Batch Sender Binary
//!
//! Sends a channel export to the CTR Center ingest endpoint, newest message
//! first, in batches separated by `INGEST_BATCH_INTERVAL_SECS`.
//!
//! Usage:
//!   cargo run -p patrolx-api --bin send_batches -- [messages.json] [ingest-url]

use std::path::PathBuf;

use patrolx_api::config::IngestConfig;
use patrolx_api::ingest::{load_messages, BatchSender, DEFAULT_MESSAGES_FILE};
use patrolx_api::telemetry::{init_tracing, TelemetryConfig};

#[tokio::main]
async fn main() {
    let telemetry_config = TelemetryConfig {
        service_name: "patrolx-send-batches".to_string(),
        ..TelemetryConfig::default()
    };
    if let Err(e) = init_tracing(&telemetry_config) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MESSAGES_FILE));

    let mut config = IngestConfig::from_env();
    if let Some(url) = args.next() {
        config.url = Some(url);
    }

    let messages = match load_messages(&path) {
        Ok(messages) => messages,
        Err(e) => {
            tracing::error!(error = %e, "Cannot load messages");
            std::process::exit(1);
        }
    };

    let sender = match BatchSender::new(&config) {
        Ok(sender) => sender,
        Err(e) => {
            tracing::error!(error = %e, "Cannot start batch sender");
            std::process::exit(1);
        }
    };

    let report = sender.send_all(messages).await;
    if report.batches_failed > 0 {
        std::process::exit(2);
    }
}
