//! HTTP surface: `GET /health`, `POST /generate`.

use crate::batch::BatchQueue;
use crate::error::ServerError;
use arena_common::model::DetailedTextToMusicPrompt;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub queue: BatchQueue,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/generate", post(generate))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    lifecycle: String,
}

async fn health(State(state): State<AppState>) -> axum::response::Response {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use crate::lifecycle::State as Lifecycle;

    let lifecycle = state.queue.lifecycle().get();
    let ready = matches!(lifecycle, Lifecycle::Ready);
    let body = HealthBody {
        status: if ready { "ok" } else { "not_ready" },
        lifecycle: lifecycle.to_string(),
    };
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body)).into_response()
}

#[derive(Deserialize)]
struct GenerateRequest {
    overall_prompt: String,
    duration: f64,
    instrumental: bool,
    lyrics: Option<String>,
    lyrics_theme: Option<String>,
    lyrics_style: Option<String>,
    seed: Option<u32>,
}

async fn generate(
    State(state): State<AppState>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<arena_common::model::TextToMusicResponse>, ServerError> {
    let prompt = DetailedTextToMusicPrompt::new(
        body.overall_prompt,
        body.duration,
        body.instrumental,
        body.lyrics,
        body.lyrics_theme,
        body.lyrics_style,
        body.seed,
    )
    .map_err(|e| ServerError::Validation(e.to_string()))?;

    let response = state.queue.generate(prompt).await?;
    Ok(Json(response))
}
