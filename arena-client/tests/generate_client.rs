use arena_client::{GenerateError, GeneratorClient};
use arena_common::model::DetailedTextToMusicPrompt;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn prompt() -> DetailedTextToMusicPrompt {
    DetailedTextToMusicPrompt::new(
        "a calm piano piece".to_string(),
        30.0,
        true,
        None,
        None,
        None,
        Some(42),
    )
    .unwrap()
}

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn health_reports_ok_for_live_server() {
    let router = Router::new().route("/health", get(|| async { Json(json!({"status": "ok"})) }));
    let base_url = spawn(router).await;

    let client = GeneratorClient::new(base_url);
    let status = client.health().await.unwrap();
    assert!(status.ok);
}

#[tokio::test]
async fn generate_succeeds_on_first_try() {
    let router = Router::new().route(
        "/generate",
        post(|| async {
            Json(json!({
                "audio_b64": "AAAA",
                "sample_rate": 44100,
                "lyrics": null,
                "metadata": {"batch_size": 1, "queue_wait_ms": 0, "generate_ms": 5, "model_warm": true}
            }))
        }),
    );
    let base_url = spawn(router).await;

    let client = GeneratorClient::new(base_url);
    let response = client.generate(&prompt()).await.unwrap();
    assert_eq!(response.sample_rate, 44100);
    assert!(response.metadata.model_warm);
}

#[tokio::test]
async fn generate_retries_on_internal_server_error_then_succeeds() {
    let calls = Arc::new(AtomicUsize::new(0));
    let router = Router::new().route(
        "/generate",
        post({
            let calls = calls.clone();
            move || {
                let calls = calls.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 1 {
                        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"detail": "boom", "code": "internal_error"}))).into_response()
                    } else {
                        Json(json!({
                            "audio_b64": "AAAA",
                            "sample_rate": 44100,
                            "lyrics": null,
                            "metadata": {"batch_size": 1, "queue_wait_ms": 0, "generate_ms": 5, "model_warm": false}
                        }))
                        .into_response()
                    }
                }
            }
        }),
    );
    let base_url = spawn(router).await;

    let client = GeneratorClient::new(base_url);
    let response = client.generate(&prompt()).await.unwrap();
    assert_eq!(response.sample_rate, 44100);
    assert!(calls.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn generate_does_not_retry_on_4xx() {
    let calls = Arc::new(AtomicUsize::new(0));
    let router = Router::new().route(
        "/generate",
        post({
            let calls = calls.clone();
            move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        Json(json!({"detail": "prompt rejected", "code": "validation_error"})),
                    )
                }
            }
        }),
    );
    let base_url = spawn(router).await;

    let client = GeneratorClient::new(base_url);
    let err = client.generate(&prompt()).await.unwrap_err();
    assert!(matches!(err, GenerateError::Rejected(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn generate_against_closed_port_is_unreachable() {
    // Bind then immediately drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = GeneratorClient::new(format!("http://{addr}"));
    let err = client.generate(&prompt()).await.unwrap_err();
    assert_eq!(err, GenerateError::Unreachable);
}
