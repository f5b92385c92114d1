//! Configuration: CLI flags override environment variables, which override
//! a TOML config file, which overrides compiled defaults (same layered
//! resolution used by every binary in this workspace).

use arena_common::config::{
    resolve_parsed, resolve_str, DEFAULT_FLAKINESS, DEFAULT_MINIMUM_LISTEN_TIME, ENV_FLAKINESS,
    ENV_MINIMUM_LISTEN_TIME, ENV_SYSTEMS_BASE_URL,
};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "arena-gateway")]
#[command(about = "Routes pairwise text-to-music preference battles to registered systems")]
#[command(version)]
pub struct Args {
    /// Path to a TOML config file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub port: Option<u16>,

    /// Path to the registry catalog YAML.
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Path to the prebaked-prompts file (TOML), next to the catalog by
    /// default.
    #[arg(long)]
    pub prebaked: Option<PathBuf>,

    /// Directory the file-backed stores persist under, when not using the
    /// in-memory stores.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    #[arg(long)]
    pub minimum_listen_time: Option<f64>,

    #[arg(long)]
    pub flakiness: Option<f64>,

    #[arg(long)]
    pub generate_deadline_secs: Option<f64>,

    /// Use the in-memory stores instead of the sqlite-backed ones. Useful in
    /// dev and in tests; the persisted deployment always sets this false.
    #[arg(long)]
    pub memory_store: bool,

    /// Base URL systems' per-variant ports are appended to, e.g.
    /// `http://localhost`.
    #[arg(long)]
    pub systems_base_url: Option<String>,

    /// Path to the sampler weights file (TOML), next to the catalog by
    /// default. Missing file means an empty (uniform-fallback) weight table.
    #[arg(long)]
    pub weights: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub catalog: PathBuf,
    pub prebaked: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub minimum_listen_time: f64,
    pub flakiness: f64,
    pub generate_deadline_secs: f64,
    pub memory_store: bool,
    pub systems_base_url: String,
    pub weights: Option<PathBuf>,
}

impl Config {
    pub fn resolve(args: &Args) -> arena_common::Result<Self> {
        let config_path = args.config.as_ref();
        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| arena_common::config::default_data_dir("arena-gateway"));
        let catalog = args.catalog.clone().unwrap_or_else(|| data_dir.join("catalog.yaml"));
        let prebaked = args
            .prebaked
            .clone()
            .or_else(|| catalog.parent().map(|p| p.join("prebaked.toml")));
        let weights = args
            .weights
            .clone()
            .or_else(|| catalog.parent().map(|p| p.join("weights.toml")));

        Ok(Self {
            port: resolve_parsed(
                args.port.map(|p| p.to_string()).as_deref(),
                "ARENA_GATEWAY_PORT",
                config_path,
                "port",
                8080,
            )?,
            catalog,
            prebaked,
            data_dir,
            minimum_listen_time: resolve_parsed(
                args.minimum_listen_time.map(|v| v.to_string()).as_deref(),
                ENV_MINIMUM_LISTEN_TIME,
                config_path,
                "minimum_listen_time",
                DEFAULT_MINIMUM_LISTEN_TIME,
            )?,
            flakiness: resolve_parsed(
                args.flakiness.map(|v| v.to_string()).as_deref(),
                ENV_FLAKINESS,
                config_path,
                "flakiness",
                DEFAULT_FLAKINESS,
            )?,
            generate_deadline_secs: resolve_parsed(
                args.generate_deadline_secs.map(|v| v.to_string()).as_deref(),
                "ARENA_GENERATE_DEADLINE_SECS",
                config_path,
                "generate_deadline_secs",
                180.0,
            )?,
            memory_store: args.memory_store
                || resolve_str(None, "ARENA_MEMORY_STORE", config_path, "memory_store", "")
                    == "1",
            systems_base_url: resolve_str(
                args.systems_base_url.as_deref(),
                ENV_SYSTEMS_BASE_URL,
                config_path,
                "systems_base_url",
                "http://localhost",
            ),
            weights,
        })
    }
}
