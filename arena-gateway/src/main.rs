use arena_common::store::{FsBlobStore, MemoryBlobStore, MemoryDocStore, SqliteDocStore};
use arena_common::store::{BlobStore, DocStore};
use arena_gateway::config::Args;
use arena_gateway::pipeline::{LocalProvider, Pipeline};
use arena_gateway::state::{AppState, PrebakedPrompt};
use arena_gateway::{http, Config};
use arena_registry::{Registry, SamplerConfig};
use clap::Parser;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let args = Args::parse();
    let config = match Config::resolve(&args) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "failed to resolve configuration");
            std::process::exit(arena_common::config::exit_code::CONFIG_ERROR);
        }
    };
    tracing::info!(?config, "resolved configuration");

    let registry = match Registry::load(&config.catalog, |s| std::env::var(s).is_ok()) {
        Ok(registry) => registry,
        Err(err) => {
            tracing::error!(%err, "failed to load registry catalog");
            std::process::exit(err.exit_code());
        }
    };

    let weights = load_weights(&config);
    let prebaked = load_prebaked(&config);

    let clients = AppState::build_clients(
        &registry,
        &config.systems_base_url,
        Duration::from_secs_f64(config.generate_deadline_secs),
    );

    let (blob_store, doc_store): (Arc<dyn BlobStore>, Arc<dyn DocStore>) = if config.memory_store {
        (Arc::new(MemoryBlobStore::new()), Arc::new(MemoryDocStore::new()))
    } else {
        std::fs::create_dir_all(&config.data_dir)?;
        let doc_store = SqliteDocStore::connect(&config.data_dir.join("gateway.db")).await?;
        (
            Arc::new(FsBlobStore::new(config.data_dir.join("blobs"))),
            Arc::new(doc_store),
        )
    };

    let pipeline = Arc::new(Pipeline::new(Box::new(LocalProvider), "gateway-v1"));

    let state = AppState {
        registry: Arc::new(registry),
        pipeline,
        clients: Arc::new(clients),
        blob_store,
        doc_store,
        sampler_config: SamplerConfig::default(),
        weights: Arc::new(weights),
        config: config.clone(),
        startup_time: chrono::Utc::now(),
        prebaked: Arc::new(prebaked),
    };

    let app = http::router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("gateway stopped");
    Ok(())
}

fn load_weights(config: &Config) -> HashMap<(arena_common::model::SystemKey, arena_common::model::SystemKey), f64> {
    let Some(path) = &config.weights else {
        return HashMap::new();
    };
    let Ok(contents) = std::fs::read_to_string(path) else {
        tracing::info!(path = %path.display(), "no weights file found, sampling uniformly");
        return HashMap::new();
    };
    #[derive(serde::Deserialize)]
    struct RawWeights {
        #[serde(default)]
        pairs: Vec<RawWeight>,
    }
    #[derive(serde::Deserialize)]
    struct RawWeight {
        a: String,
        b: String,
        weight: f64,
    }
    let raw: RawWeights = match toml::from_str(&contents) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(%err, "malformed weights file, sampling uniformly");
            return HashMap::new();
        }
    };
    raw.pairs
        .into_iter()
        .filter_map(|w| {
            let a = w.a.parse().ok()?;
            let b = w.b.parse().ok()?;
            Some(((a, b), w.weight))
        })
        .collect()
}

fn load_prebaked(config: &Config) -> HashMap<String, PrebakedPrompt> {
    let Some(path) = &config.prebaked else {
        return HashMap::new();
    };
    let Ok(contents) = std::fs::read_to_string(path) else {
        return HashMap::new();
    };
    #[derive(serde::Deserialize)]
    struct RawPrebaked {
        #[serde(flatten)]
        entries: HashMap<String, PrebakedPrompt>,
    }
    match toml::from_str::<RawPrebaked>(&contents) {
        Ok(raw) => raw.entries,
        Err(err) => {
            tracing::warn!(%err, "malformed prebaked-prompts file, ignoring");
            HashMap::new()
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
