//! Configuration: CLI flags override environment variables, which override
//! a TOML config file, which overrides compiled defaults — the same layered
//! resolution as every other binary in this workspace.

use arena_common::config::resolve_parsed;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "arena-system-server")]
#[command(about = "Single-model micro-batching text-to-music generation service")]
#[command(version)]
pub struct Args {
    /// Path to a TOML config file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub max_batch_size: Option<usize>,

    #[arg(long)]
    pub max_delay_secs: Option<f64>,

    #[arg(long)]
    pub gpu_total_gb: Option<f64>,

    #[arg(long)]
    pub gpu_mem_gb_per_item: Option<f64>,

    #[arg(long)]
    pub queue_capacity: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub max_batch_size: usize,
    pub max_delay_secs: f64,
    pub gpu_total_gb: f64,
    pub gpu_mem_gb_per_item: f64,
    pub queue_capacity: usize,
}

impl Config {
    pub fn resolve(args: &Args) -> arena_common::Result<Self> {
        let config_path = args.config.as_ref();
        Ok(Self {
            port: resolve_parsed(
                args.port.map(|p| p.to_string()).as_deref(),
                "ARENA_SYSTEM_SERVER_PORT",
                config_path,
                "port",
                8088,
            )?,
            max_batch_size: resolve_parsed(
                args.max_batch_size.map(|v| v.to_string()).as_deref(),
                "ARENA_MAX_BATCH_SIZE",
                config_path,
                "max_batch_size",
                4,
            )?,
            max_delay_secs: resolve_parsed(
                args.max_delay_secs.map(|v| v.to_string()).as_deref(),
                "ARENA_MAX_DELAY_SECS",
                config_path,
                "max_delay_secs",
                2.0,
            )?,
            gpu_total_gb: resolve_parsed(
                args.gpu_total_gb.map(|v| v.to_string()).as_deref(),
                "ARENA_GPU_TOTAL_GB",
                config_path,
                "gpu_total_gb",
                16.0,
            )?,
            gpu_mem_gb_per_item: resolve_parsed(
                args.gpu_mem_gb_per_item.map(|v| v.to_string()).as_deref(),
                "ARENA_GPU_MEM_GB_PER_ITEM",
                config_path,
                "gpu_mem_gb_per_item",
                2.0,
            )?,
            queue_capacity: resolve_parsed(
                args.queue_capacity.map(|v| v.to_string()).as_deref(),
                "ARENA_QUEUE_CAPACITY",
                config_path,
                "queue_capacity",
                64,
            )?,
        })
    }

    /// `min(max_batch_size, floor(gpu_total_gb / gpu_mem_gb_per_item))`.
    pub fn effective_batch_limit(&self) -> usize {
        let memory_limit = (self.gpu_total_gb / self.gpu_mem_gb_per_item).floor() as usize;
        self.max_batch_size.min(memory_limit.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_batch_limit_is_bounded_by_gpu_memory() {
        let config = Config {
            port: 0,
            max_batch_size: 8,
            max_delay_secs: 1.0,
            gpu_total_gb: 4.0,
            gpu_mem_gb_per_item: 2.0,
            queue_capacity: 1,
        };
        assert_eq!(config.effective_batch_limit(), 2);
    }

    #[test]
    fn effective_batch_limit_is_bounded_by_max_batch_size() {
        let config = Config {
            port: 0,
            max_batch_size: 2,
            max_delay_secs: 1.0,
            gpu_total_gb: 64.0,
            gpu_mem_gb_per_item: 1.0,
            queue_capacity: 1,
        };
        assert_eq!(config.effective_batch_limit(), 2);
    }
}
