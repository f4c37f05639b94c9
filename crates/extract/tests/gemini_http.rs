//! Drives `GeminiModel` through `ReceiptPipeline` against a local fake of the
//! `generateContent` endpoint.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use expensa_extract::{GeminiModel, ModelConfig, PipelineError, ReceiptPipeline, RetryPolicy};
use serde_json::{json, Value};

#[derive(Clone)]
struct Fake {
    hits: Arc<AtomicU32>,
    /// Number of leading requests answered with 503.
    overloaded: u32,
    answer: Value,
}

async fn generate(
    State(fake): State<Fake>,
    Path(action): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let hit = fake.hits.fetch_add(1, Ordering::SeqCst);

    if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some("test-key") {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": {"code": 403, "message": "API key not valid.", "status": "PERMISSION_DENIED"}})),
        );
    }
    if action != "gemini-test:generateContent" {
        return (StatusCode::NOT_FOUND, Json(json!({"error": {"code": 404, "message": action}})));
    }
    if body["contents"][0]["parts"][0]["inline_data"]["data"].as_str().is_none() {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": {"code": 400, "message": "no image"}})));
    }
    if hit < fake.overloaded {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": {"code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE"}})),
        );
    }
    (StatusCode::OK, Json(fake.answer.clone()))
}

async fn spawn_fake(overloaded: u32, answer: Value) -> (SocketAddr, Arc<AtomicU32>) {
    let hits = Arc::new(AtomicU32::new(0));
    let fake = Fake { hits: hits.clone(), overloaded, answer };
    let app = Router::new()
        .route("/v1beta/models/{action}", post(generate))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, hits)
}

fn config(addr: SocketAddr, key: &str) -> ModelConfig {
    let mut config = ModelConfig::new(key);
    config.endpoint = format!("http://{addr}");
    config.model = "gemini-test".into();
    config
}

fn add_receipt_answer() -> Value {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{
                    "functionCall": {
                        "name": "addReceipt",
                        "args": {
                            "date": "2024-02-17",
                            "amount": 23.4,
                            "shop": "Edeka",
                            "description": "Groceries"
                        }
                    }
                }]
            },
            "finishReason": "STOP"
        }]
    })
}

#[tokio::test]
async fn extracts_expense_over_http() {
    let (addr, hits) = spawn_fake(0, add_receipt_answer()).await;
    let pipeline = ReceiptPipeline::new(GeminiModel::new(config(addr, "test-key")));

    let expense = pipeline.process_bytes(&[0xff, 0xd8, 0xff]).await.unwrap();
    assert_eq!(expense.shop, "Edeka");
    assert_eq!(expense.amount, 23.4);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retries_overloaded_backend() {
    let (addr, hits) = spawn_fake(1, add_receipt_answer()).await;
    let pipeline =
        ReceiptPipeline::new(GeminiModel::new(config(addr, "test-key"))).with_retry(RetryPolicy::new(2));

    let expense = pipeline.process_bytes(&[0xff, 0xd8]).await.unwrap();
    assert_eq!(expense.date, "2024-02-17");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn forbidden_is_not_retried() {
    let (addr, hits) = spawn_fake(0, add_receipt_answer()).await;
    let pipeline = ReceiptPipeline::new(GeminiModel::new(config(addr, "wrong-key")));

    match pipeline.process_bytes(&[0xff, 0xd8]).await {
        Err(PipelineError::Upstream(err)) => {
            assert_eq!(err.attempts, 1);
            assert_eq!(err.source.status(), Some(403));
            assert!(err.to_string().contains("API key not valid."));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn textual_mode_reads_fenced_json() {
    let answer = json!({
        "candidates": [{
            "content": {
                "parts": [{
                    "text": "```json\n{\"date\": \"2024-02-17\", \"amount\": \"23.40\", \"shop\": \"Edeka\", \"description\": \"Groceries\", \"confidence\": 0.8}\n```"
                }]
            }
        }]
    });
    let (addr, _) = spawn_fake(0, answer).await;
    let model = GeminiModel::new(config(addr, "test-key")).without_tools();
    let pipeline = ReceiptPipeline::new(model);

    let expense = pipeline.process_bytes_textual(&[0xff, 0xd8]).await.unwrap();
    assert_eq!(expense.amount, "23.40");
    assert_eq!(expense.confidence, 0.8);
}
