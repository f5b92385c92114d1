//! HTTP surface: `GET /systems`, `GET /prebaked`,
//! `GET /health`, `POST /generate_battle`, `POST /record_vote`, and a
//! `GET /blobs/:key` proxy so a battle's audio URLs are curlable regardless
//! of the configured blob backend.

use crate::error::GatewayError;
use crate::orchestrator::{BattleOrchestrator, BattleRequest};
use crate::state::{AppState, PrebakedPrompt};
use arena_common::model::{BattleRecord, DetailedTextToMusicPrompt, SideMetadata, Session, User, Vote};
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/systems", get(systems))
        .route("/prebaked", get(prebaked))
        .route("/health", get(health))
        .route("/generate_battle", post(generate_battle))
        .route("/record_vote/:battle_uuid", post(record_vote))
        .route("/blobs/*key", get(blob))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct SystemSummary {
    system_tag: String,
    variant_tag: String,
}

async fn systems(State(state): State<AppState>) -> Json<Vec<SystemSummary>> {
    let systems = state
        .registry
        .all()
        .into_iter()
        .map(|key| SystemSummary {
            system_tag: key.system_tag,
            variant_tag: key.variant_tag,
        })
        .collect();
    Json(systems)
}

async fn prebaked(State(state): State<AppState>) -> Json<std::collections::HashMap<String, PrebakedPrompt>> {
    Json((*state.prebaked).clone())
}

#[derive(Serialize)]
struct SystemHealth {
    system: String,
    reachable: bool,
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    uptime_secs: i64,
    systems: Vec<SystemHealth>,
}

/// Best-effort rollup of every registered system's last-known health. Each
/// probe gets a short timeout; a slow or unreachable system never blocks the
/// gateway's own liveness answer beyond that window.
async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

    let probes = state.clients.iter().map(|(key, client)| async move {
        let reachable = tokio::time::timeout(PROBE_TIMEOUT, client.health())
            .await
            .map(|r| r.map(|h| h.ok).unwrap_or(false))
            .unwrap_or(false);
        SystemHealth {
            system: key.to_string(),
            reachable,
        }
    });
    let systems = futures::future::join_all(probes).await;

    Json(HealthBody {
        status: "ok",
        uptime_secs: (chrono::Utc::now() - state.startup_time).num_seconds(),
        systems,
    })
}

#[derive(Deserialize)]
struct GenerateBattleRequest {
    session: Session,
    user: User,
    free_text: String,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    instrumental: Option<bool>,
}

/// Pre-vote wire shape for `/generate_battle`. Deliberately narrower than
/// [`BattleRecord`]: it carries nothing a client could use to recover
/// `a_system_key` or `b_system_key` (no `session`, no `user`, and the keys
/// themselves are never included — only the redacted metadata).
#[derive(Serialize)]
struct BattleResponse {
    uuid: uuid::Uuid,
    a_audio_url: String,
    b_audio_url: String,
    a_metadata: SideMetadata,
    b_metadata: SideMetadata,
    prompt_detailed: DetailedTextToMusicPrompt,
}

impl From<BattleRecord> for BattleResponse {
    fn from(record: BattleRecord) -> Self {
        Self {
            uuid: record.uuid,
            a_audio_url: record.a_audio_uri,
            b_audio_url: record.b_audio_uri,
            a_metadata: record.a_metadata,
            b_metadata: record.b_metadata,
            prompt_detailed: record.prompt.detailed,
        }
    }
}

async fn generate_battle(
    State(state): State<AppState>,
    Json(body): Json<GenerateBattleRequest>,
) -> Result<Json<BattleResponse>, GatewayError> {
    if body.free_text.trim().is_empty() {
        return Err(GatewayError::Validation("free_text must not be empty".to_string()));
    }

    let orchestrator = BattleOrchestrator::new(state);
    let record = orchestrator
        .generate_battle(BattleRequest {
            session: body.session,
            user: body.user,
            free_text: body.free_text,
            requested_duration: body.duration,
            requested_instrumental: body.instrumental,
        })
        .await?;
    Ok(Json(record.into()))
}

async fn record_vote(
    State(state): State<AppState>,
    Path(battle_uuid): Path<uuid::Uuid>,
    Json(vote): Json<Vote>,
) -> Result<Json<BattleRecord>, GatewayError> {
    let orchestrator = BattleOrchestrator::new(state);
    let record = orchestrator.record_vote(battle_uuid, vote).await?;
    Ok(Json(record))
}

async fn blob(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Vec<u8>, GatewayError> {
    let bytes = state.blob_store.get(&key).await?;
    Ok(bytes)
}
