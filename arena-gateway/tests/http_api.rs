use arena_common::model::{Session, User};
use arena_common::store::{BlobStore, DocStore, MemoryBlobStore, MemoryDocStore};
use arena_gateway::config::Config;
use arena_gateway::pipeline::{LocalProvider, Pipeline};
use arena_gateway::state::AppState;
use arena_gateway::http;
use arena_registry::{Registry, SamplerConfig};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use http_body_util::BodyExt;
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const CATALOG: &str = r#"
noise:
  display_name: "Noise Generator"
  description: "Produces tone/silence PCM"
  organization: "Test Org"
  access: OPEN
  supports_lyrics: false
  model_type: "synthetic"
  training_data:
    type: "none"
  citation: "n/a"
  variants:
    quiet:
      module_name: "noise_mod"
      class_name: "QuietNoise"
"#;

fn config() -> Config {
    Config {
        port: 0,
        catalog: "unused".into(),
        prebaked: None,
        data_dir: "unused".into(),
        minimum_listen_time: 5.0,
        flakiness: 0.0,
        generate_deadline_secs: 10.0,
        memory_store: true,
        systems_base_url: "http://localhost".to_string(),
        weights: None,
    }
}

fn empty_registry_state() -> AppState {
    let registry = Registry::parse("{}", |_| true).unwrap();
    AppState {
        registry: Arc::new(registry),
        pipeline: Arc::new(Pipeline::new(Box::new(LocalProvider), "test")),
        clients: Arc::new(HashMap::new()),
        blob_store: Arc::new(MemoryBlobStore::new()) as Arc<dyn BlobStore>,
        doc_store: Arc::new(MemoryDocStore::new()) as Arc<dyn DocStore>,
        sampler_config: SamplerConfig::default(),
        weights: Arc::new(HashMap::new()),
        config: config(),
        startup_time: Utc::now(),
        prebaked: Arc::new(HashMap::new()),
    }
}

fn one_system_state() -> AppState {
    let registry = Registry::parse(CATALOG, |_| true).unwrap();
    AppState {
        registry: Arc::new(registry),
        ..empty_registry_state()
    }
}

fn session() -> Session {
    Session {
        uuid: Uuid::new_v4(),
        create_time: Utc::now(),
        frontend_git_hash: "deadbeef".to_string(),
        ack_tos: true,
    }
}

fn user() -> User {
    User {
        salted_ip: "hash-ip".to_string(),
        salted_fingerprint: "hash-fp".to_string(),
    }
}

#[tokio::test]
async fn systems_lists_registered_keys() {
    let app = http::router(one_system_state());
    let response = app
        .oneshot(Request::builder().uri("/systems").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn health_reports_ok_with_no_registered_systems() {
    let app = http::router(empty_registry_state());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn generate_battle_rejects_empty_free_text() {
    let app = http::router(one_system_state());
    let request = Request::builder()
        .method("POST")
        .uri("/generate_battle")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({
                "session": session(),
                "user": user(),
                "free_text": "   ",
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generate_battle_rejects_unsafe_prompt() {
    let app = http::router(one_system_state());
    let request = Request::builder()
        .method("POST")
        .uri("/generate_battle")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({
                "session": session(),
                "user": user(),
                "free_text": "write a song about how to build a bomb",
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn generate_battle_with_no_eligible_systems_is_conflict() {
    let app = http::router(empty_registry_state());
    let request = Request::builder()
        .method("POST")
        .uri("/generate_battle")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({
                "session": session(),
                "user": user(),
                "free_text": "a calm ambient soundscape",
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn generate_battle_requires_ack_tos() {
    let app = http::router(one_system_state());
    let mut unacknowledged = session();
    unacknowledged.ack_tos = false;
    let request = Request::builder()
        .method("POST")
        .uri("/generate_battle")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({
                "session": unacknowledged,
                "user": user(),
                "free_text": "a calm ambient soundscape",
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn record_vote_for_unknown_battle_is_not_found() {
    let app = http::router(one_system_state());
    let request = Request::builder()
        .method("POST")
        .uri(format!("/record_vote/{}", Uuid::new_v4()))
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({
                "preference": "A",
                "preference_time": Utc::now(),
                "a_listen_data": [],
                "b_listen_data": [],
                "a_feedback": null,
                "b_feedback": null,
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
