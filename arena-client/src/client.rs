//! Typed HTTP client to one System Server endpoint.

use crate::circuit::CircuitBreaker;
use crate::error::GenerateError;
use arena_common::model::{DetailedTextToMusicPrompt, GenerationMetadata, TextToMusicResponse};
use serde::Deserialize;
use std::time::{Duration, Instant};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_TOTAL_DEADLINE: Duration = Duration::from_secs(180);
const MAX_EXTRA_ATTEMPTS: u32 = 2;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub ok: bool,
    pub latency: Duration,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
    code: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponseBody {
    audio_b64: String,
    sample_rate: u32,
    lyrics: Option<String>,
    metadata: GenerationMetadata,
}

pub struct GeneratorClient {
    base_url: String,
    http: reqwest::Client,
    total_deadline: Duration,
    breaker: CircuitBreaker,
}

impl GeneratorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_deadline(base_url, DEFAULT_TOTAL_DEADLINE)
    }

    pub fn with_deadline(base_url: impl Into<String>, total_deadline: Duration) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .expect("reqwest client with static config never fails to build");
        Self {
            base_url: base_url.into(),
            http,
            total_deadline,
            breaker: CircuitBreaker::new(),
        }
    }

    pub async fn health(&self) -> Result<HealthStatus, GenerateError> {
        if self.breaker.is_open() {
            return Err(GenerateError::Unreachable);
        }

        let start = Instant::now();
        let result = self.http.get(format!("{}/health", self.base_url)).send().await;
        match result {
            Ok(resp) if resp.status().is_success() => {
                self.breaker.record_success();
                Ok(HealthStatus {
                    ok: true,
                    latency: start.elapsed(),
                })
            }
            Ok(_) => {
                // 503 NOT_READY is a live-but-not-ready answer, not an
                // unreachability signal for the breaker.
                Ok(HealthStatus {
                    ok: false,
                    latency: start.elapsed(),
                })
            }
            Err(_) => {
                self.breaker.record_unreachable();
                Err(GenerateError::Unreachable)
            }
        }
    }

    pub async fn generate(
        &self,
        prompt: &DetailedTextToMusicPrompt,
    ) -> Result<TextToMusicResponse, GenerateError> {
        let attempt_future = self.generate_with_retries(prompt);
        match tokio::time::timeout(self.total_deadline, attempt_future).await {
            Ok(result) => result,
            Err(_) => Err(GenerateError::Timeout),
        }
    }

    async fn generate_with_retries(
        &self,
        prompt: &DetailedTextToMusicPrompt,
    ) -> Result<TextToMusicResponse, GenerateError> {
        let mut backoff = INITIAL_BACKOFF;
        for attempt in 0..=MAX_EXTRA_ATTEMPTS {
            if self.breaker.is_open() {
                return Err(GenerateError::Unreachable);
            }

            match self.generate_once(prompt).await {
                Ok(response) => {
                    self.breaker.record_success();
                    return Ok(response);
                }
                Err(err) => {
                    if err.is_unreachable() {
                        self.breaker.record_unreachable();
                    }
                    if attempt == MAX_EXTRA_ATTEMPTS || !err.is_retryable() {
                        return Err(err);
                    }
                    tracing::warn!(
                        endpoint = %self.base_url,
                        attempt,
                        error = %err,
                        backoff_ms = backoff.as_millis() as u64,
                        "generator call failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
        unreachable!("loop always returns on its last iteration")
    }

    async fn generate_once(
        &self,
        prompt: &DetailedTextToMusicPrompt,
    ) -> Result<TextToMusicResponse, GenerateError> {
        let resp = self
            .http
            .post(format!("{}/generate", self.base_url))
            .json(prompt)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerateError::Timeout
                } else {
                    GenerateError::Unreachable
                }
            })?;

        let status = resp.status();
        if status.is_success() {
            let body: GenerateResponseBody = resp
                .json()
                .await
                .map_err(|e| GenerateError::InternalServerError(e.to_string()))?;
            let audio_bytes = base64_decode(&body.audio_b64)
                .map_err(|e| GenerateError::InternalServerError(e.to_string()))?;
            return Ok(TextToMusicResponse {
                audio_bytes,
                sample_rate: body.sample_rate,
                lyrics: body.lyrics,
                metadata: body.metadata,
            });
        }

        let body: Option<ErrorBody> = resp.json().await.ok();
        let detail = body
            .as_ref()
            .map(|b| b.detail.clone())
            .unwrap_or_else(|| status.to_string());
        let code = body.as_ref().map(|b| b.code.as_str()).unwrap_or("");

        Err(match (status.as_u16(), code) {
            (504, _) => GenerateError::BatchTimeout,
            (_, "unsupported") => GenerateError::Unsupported,
            (s, _) if (400..500).contains(&s) => GenerateError::Rejected(detail),
            _ => GenerateError::InternalServerError(detail),
        })
    }
}

fn base64_decode(s: &str) -> Result<Vec<u8>, String> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(s.as_bytes())
        .map_err(|e| e.to_string())
}
