//! Drives the full orchestrator against real (in-process) System Servers
//! backed by `FakeBackend`, covering the happy path, the one-resample
//! failure policy, and the insufficient-listen-time vote precondition.

use arena_client::GeneratorClient;
use arena_common::model::{
    ListenEvent, ListenEventKind, Preference, Session, SideMetadata, User, Vote,
};
use arena_common::store::{BlobStore, DocStore, MemoryBlobStore, MemoryDocStore};
use arena_gateway::config::Config;
use arena_gateway::http;
use arena_gateway::orchestrator::{BattleOrchestrator, BattleRequest};
use arena_gateway::pipeline::{LocalProvider, Pipeline};
use arena_gateway::state::AppState;
use arena_registry::{Registry, SamplerConfig};
use arena_system_server::{self as server};
use axum::body::Body;
use axum::http::Request;
use chrono::Utc;
use http_body_util::BodyExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
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
    loud:
      module_name: "noise_mod"
      class_name: "LoudNoise"
    medium:
      module_name: "noise_mod"
      class_name: "MediumNoise"
"#;

/// Spawns a real system server on an OS-assigned loopback port and returns
/// its base URL. The server runs until the test process exits.
async fn spawn_system_server() -> String {
    let config = server::Config {
        port: 0,
        max_batch_size: 4,
        max_delay_secs: 0.05,
        gpu_total_gb: 16.0,
        gpu_mem_gb_per_item: 1.0,
        queue_capacity: 64,
    };
    let backend: Arc<dyn server::GenerationBackend> = Arc::new(server::FakeBackend::new());
    let (queue, _handle) = server::batch::spawn(config, backend);
    let app = server::http::router(server::http::AppState { queue });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Reserves a loopback port and drops the listener immediately, so any
/// connection attempt against it fails fast with connection-refused rather
/// than hanging on the connect timeout.
async fn dead_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

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

fn battle_request() -> BattleRequest {
    BattleRequest {
        session: session(),
        user: user(),
        free_text: "an upbeat electronic track".to_string(),
        requested_duration: Some(2.0),
        requested_instrumental: Some(true),
    }
}

fn state_with_clients(clients: HashMap<arena_common::model::SystemKey, GeneratorClient>) -> AppState {
    let registry = Registry::parse(CATALOG, |_| true).unwrap();
    AppState {
        registry: Arc::new(registry),
        pipeline: Arc::new(Pipeline::new(Box::new(LocalProvider), "test")),
        clients: Arc::new(clients),
        blob_store: Arc::new(MemoryBlobStore::new()) as Arc<dyn BlobStore>,
        doc_store: Arc::new(MemoryDocStore::new()) as Arc<dyn DocStore>,
        sampler_config: SamplerConfig::default(),
        weights: Arc::new(HashMap::new()),
        config: config(),
        startup_time: Utc::now(),
        prebaked: Arc::new(HashMap::new()),
    }
}

/// S1 — happy path: two live systems, a battle completes with anonymized
/// metadata, and a subsequent vote reveals distinct system identities.
#[tokio::test]
async fn happy_path_generates_and_reveals_on_vote() {
    let quiet_url = spawn_system_server().await;
    let loud_url = spawn_system_server().await;
    let mut clients = HashMap::new();
    clients.insert(
        arena_common::model::SystemKey::new("noise", "quiet"),
        GeneratorClient::with_deadline(quiet_url, Duration::from_secs(5)),
    );
    clients.insert(
        arena_common::model::SystemKey::new("noise", "loud"),
        GeneratorClient::with_deadline(loud_url, Duration::from_secs(5)),
    );
    let state = state_with_clients(clients);
    let orchestrator = BattleOrchestrator::new(state.clone());

    let record = orchestrator.generate_battle(battle_request()).await.unwrap();
    assert_ne!(record.a_system_key, record.b_system_key);
    assert!(matches!(record.a_metadata, SideMetadata::Redacted(_)));
    assert!(matches!(record.b_metadata, SideMetadata::Redacted(_)));
    assert!(!record.is_revealed());

    let vote = Vote {
        preference: Preference::A,
        preference_time: Utc::now(),
        a_listen_data: vec![
            ListenEvent { event: ListenEventKind::Play, timestamp: Utc::now() - chrono::Duration::seconds(10) },
            ListenEvent { event: ListenEventKind::Pause, timestamp: Utc::now() },
        ],
        b_listen_data: vec![
            ListenEvent { event: ListenEventKind::Play, timestamp: Utc::now() - chrono::Duration::seconds(10) },
            ListenEvent { event: ListenEventKind::Pause, timestamp: Utc::now() },
        ],
        a_feedback: None,
        b_feedback: None,
    };
    let revealed = orchestrator.record_vote(record.uuid, vote).await.unwrap();
    assert!(revealed.is_revealed());
    match (&revealed.a_metadata, &revealed.b_metadata) {
        (SideMetadata::Revealed(a), SideMetadata::Revealed(b)) => {
            assert_eq!(a.key.system_tag, "noise");
            assert_eq!(b.key.system_tag, "noise");
        }
        other => panic!("expected both sides revealed, got {other:?}"),
    }
}

/// The pre-vote HTTP response must not carry either side's real system
/// identity: no `a_system_key`/`b_system_key` fields, and the registered
/// system/variant tags never appear anywhere in the serialized body.
#[tokio::test]
async fn generate_battle_response_redacts_system_identity_over_the_wire() {
    let quiet_url = spawn_system_server().await;
    let loud_url = spawn_system_server().await;
    let mut clients = HashMap::new();
    clients.insert(
        arena_common::model::SystemKey::new("noise", "quiet"),
        GeneratorClient::with_deadline(quiet_url, Duration::from_secs(5)),
    );
    clients.insert(
        arena_common::model::SystemKey::new("noise", "loud"),
        GeneratorClient::with_deadline(loud_url, Duration::from_secs(5)),
    );
    let state = state_with_clients(clients);
    let app = http::router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/generate_battle")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({
                "session": session(),
                "user": user(),
                "free_text": "an upbeat electronic track",
                "duration": 2.0,
                "instrumental": true,
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let raw = String::from_utf8(body.to_vec()).unwrap();

    assert!(!raw.contains("a_system_key"));
    assert!(!raw.contains("b_system_key"));
    assert!(!raw.contains("quiet"));
    assert!(!raw.contains("loud"));
    assert!(!raw.contains("\"session\""));
    assert!(!raw.contains("\"user\""));

    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(parsed.get("uuid").is_some());
    assert!(parsed.get("a_audio_url").is_some());
    assert!(parsed.get("b_audio_url").is_some());
}

/// S3 — one side is unreachable; the gateway resamples that side from the
/// remaining candidate and the battle still succeeds.
#[tokio::test]
async fn one_side_failure_resamples_and_succeeds() {
    let dead = dead_address().await;
    let live_a = spawn_system_server().await;
    let live_b = spawn_system_server().await;
    let mut clients = HashMap::new();
    clients.insert(
        arena_common::model::SystemKey::new("noise", "quiet"),
        GeneratorClient::with_deadline(dead, Duration::from_secs(5)),
    );
    clients.insert(
        arena_common::model::SystemKey::new("noise", "loud"),
        GeneratorClient::with_deadline(live_a, Duration::from_secs(5)),
    );
    clients.insert(
        arena_common::model::SystemKey::new("noise", "medium"),
        GeneratorClient::with_deadline(live_b, Duration::from_secs(5)),
    );
    let state = state_with_clients(clients);
    let orchestrator = BattleOrchestrator::new(state.clone());

    // Three candidates exist; whichever pair the sampler draws, at most one
    // side can be the dead "quiet" system, and it must be replaced.
    let record = orchestrator.generate_battle(battle_request()).await.unwrap();
    assert_ne!(record.a_system_key.variant_tag, "quiet");
    assert_ne!(record.b_system_key.variant_tag, "quiet");
}

/// S5 — a vote with insufficient cumulative listen time is rejected and
/// the stored record is left unrevealed.
#[tokio::test]
async fn insufficient_listen_time_rejects_without_mutating_record() {
    let quiet_url = spawn_system_server().await;
    let loud_url = spawn_system_server().await;
    let mut clients = HashMap::new();
    clients.insert(
        arena_common::model::SystemKey::new("noise", "quiet"),
        GeneratorClient::with_deadline(quiet_url, Duration::from_secs(5)),
    );
    clients.insert(
        arena_common::model::SystemKey::new("noise", "loud"),
        GeneratorClient::with_deadline(loud_url, Duration::from_secs(5)),
    );
    let mut state = state_with_clients(clients);
    state.config.minimum_listen_time = 10.0;
    let orchestrator = BattleOrchestrator::new(state.clone());

    let record = orchestrator.generate_battle(battle_request()).await.unwrap();

    let vote = Vote {
        preference: Preference::A,
        preference_time: Utc::now(),
        a_listen_data: vec![
            ListenEvent { event: ListenEventKind::Play, timestamp: Utc::now() - chrono::Duration::seconds(3) },
            ListenEvent { event: ListenEventKind::Pause, timestamp: Utc::now() },
        ],
        b_listen_data: vec![
            ListenEvent { event: ListenEventKind::Play, timestamp: Utc::now() - chrono::Duration::seconds(3) },
            ListenEvent { event: ListenEventKind::Pause, timestamp: Utc::now() },
        ],
        a_feedback: None,
        b_feedback: None,
    };
    let err = orchestrator.record_vote(record.uuid, vote).await.unwrap_err();
    assert!(matches!(err, arena_gateway::GatewayError::InsufficientListenTime));

    let stored = state.doc_store.get("battles", &record.uuid.to_string()).await.unwrap();
    let stored: arena_common::model::BattleRecord = serde_json::from_value(stored.doc).unwrap();
    assert!(!stored.is_revealed());
}
