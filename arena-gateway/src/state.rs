//! Shared application state threaded through every handler as an explicit
//! context object — no ambient globals.

use crate::config::Config;
use crate::pipeline::Pipeline;
use arena_client::GeneratorClient;
use arena_common::store::{BlobStore, DocStore};
use arena_common::model::SystemKey;
use arena_registry::{Registry, SamplerConfig};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PrebakedPrompt {
    pub prompt: String,
    pub duration: Option<f64>,
    pub instrumental: Option<bool>,
}

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub pipeline: Arc<Pipeline>,
    pub clients: Arc<HashMap<SystemKey, GeneratorClient>>,
    pub blob_store: Arc<dyn BlobStore>,
    pub doc_store: Arc<dyn DocStore>,
    pub sampler_config: SamplerConfig,
    pub weights: Arc<HashMap<(SystemKey, SystemKey), f64>>,
    pub config: Config,
    pub startup_time: DateTime<Utc>,
    pub prebaked: Arc<HashMap<String, PrebakedPrompt>>,
}

impl AppState {
    /// Builds one [`GeneratorClient`] per registered [`SystemKey`], pointed
    /// at `{systems_base_url}:{deployment_port}` — the registry never
    /// assumes a system server is actually live at this address until a
    /// call is attempted.
    pub fn build_clients(
        registry: &Registry,
        systems_base_url: &str,
        deadline: Duration,
    ) -> HashMap<SystemKey, GeneratorClient> {
        registry
            .all()
            .into_iter()
            .map(|key| {
                let base_url = format!("{systems_base_url}:{}", key.deployment_port());
                let client = GeneratorClient::with_deadline(base_url, deadline);
                (key, client)
            })
            .collect()
    }
}
