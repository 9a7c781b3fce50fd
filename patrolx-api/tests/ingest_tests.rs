//! Batch sender tests against a local ingest endpoint.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use patrolx_api::config::IngestConfig;
use patrolx_api::ingest::{BatchSender, SendReport};
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct FakeIngest {
    received: Arc<Mutex<Vec<Value>>>,
}

async fn ingest(State(fake): State<FakeIngest>, Json(body): Json<Value>) -> axum::response::Response {
    let mut received = fake.received.lock().unwrap();
    received.push(body);
    // Reject every second batch.
    if received.len() % 2 == 0 {
        (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"error": "rejected"}))).into_response()
    } else {
        Json(json!({"accepted": true})).into_response()
    }
}

async fn spawn_fake_ingest() -> (String, FakeIngest) {
    let fake = FakeIngest::default();
    let app = Router::new()
        .route("/messages", post(ingest))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/messages", addr), fake)
}

fn sender(url: String, batch_size: usize) -> BatchSender {
    BatchSender::new(&IngestConfig {
        url: Some(url),
        batch_size,
        interval: Duration::ZERO,
    })
    .unwrap()
}

/// `count` messages one minute apart, oldest first in the file.
fn messages(count: u32) -> Vec<Value> {
    (0..count)
        .map(|i| {
            json!({
                "timestamp": format!("[10:{:02} AM, 11/24/2025] Infos Partage: ", i),
                "text": format!("message {i}"),
            })
        })
        .collect()
}

#[tokio::test]
async fn test_batches_are_sent_newest_first() {
    let (url, fake) = spawn_fake_ingest().await;

    let report = sender(url, 20).send_all(messages(45)).await;

    let received = fake.received.lock().unwrap().clone();
    let sizes: Vec<usize> = received
        .iter()
        .map(|body| body["messages"].as_array().unwrap().len())
        .collect();
    assert_eq!(sizes, vec![20, 20, 5]);
    assert_eq!(received[0]["messages"][0]["text"], json!("message 44"));
    assert_eq!(received[1]["messages"][0]["text"], json!("message 24"));
    assert_eq!(received[2]["messages"][4]["text"], json!("message 0"));

    assert_eq!(
        report,
        SendReport {
            batches_sent: 2,
            batches_failed: 1,
            messages_sent: 25,
        }
    );
}

#[tokio::test]
async fn test_unreachable_endpoint_fails_every_batch() {
    let report = sender("http://127.0.0.1:1/messages".to_string(), 2)
        .send_all(messages(5))
        .await;
    assert_eq!(report.batches_sent, 0);
    assert_eq!(report.batches_failed, 3);
}

#[tokio::test]
async fn test_empty_export_sends_nothing() {
    let (url, fake) = spawn_fake_ingest().await;
    let report = sender(url, 20).send_all(Vec::new()).await;
    assert_eq!(report, SendReport::default());
    assert!(fake.received.lock().unwrap().is_empty());
}
