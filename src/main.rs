//! pnode-monitor daemon
//!
//! Serves the dashboard API on top of live pNode discovery.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use pnode_monitor::config::{Config, RuntimeMode};
use pnode_monitor::geo::IpApiProvider;
use pnode_monitor::rpc::HttpPodClientFactory;
use pnode_monitor::{create_router, AppState};

#[derive(Parser)]
#[command(name = "pnode-monitor")]
#[command(about = "Discovery, caching and analytics service for the pNode dashboard")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "pnode-monitor.toml")]
    config: String,

    /// HTTP port (overrides config file)
    #[arg(short, long, env = "PNODE_MONITOR_PORT")]
    port: Option<u16>,

    /// Runtime mode: development or production (overrides config file)
    #[arg(long, env = "PNODE_MONITOR_MODE")]
    mode: Option<RuntimeMode>,

    /// Comma-separated seed hosts, primary first (overrides config file)
    #[arg(long, env = "PNODE_MONITOR_SEEDS", value_delimiter = ',')]
    seeds: Option<Vec<String>>,

    /// Seconds since last seen for a pod to count as online
    #[arg(long, env = "ONLINE_THRESHOLD_SECONDS")]
    online_threshold: Option<u64>,
}

impl Cli {
    /// Apply CLI and environment overrides on top of the loaded config
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.api.http_port = port;
        }
        if let Some(mode) = self.mode {
            config.cache.mode = mode;
        }
        if let Some(secs) = self.online_threshold {
            config.network.online_threshold_secs = secs;
        }
        if let Some(seeds) = &self.seeds {
            let seeds: Vec<String> = seeds
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if !seeds.is_empty() {
                config.network.seeds = seeds;
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pnode_monitor=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    info!("Starting pnode-monitor");
    info!("Config file: {}", cli.config);

    // Load or create default config
    if !std::path::Path::new(&cli.config).exists() {
        info!("Config file not found, using defaults");
    }
    let mut config = Config::load(&cli.config)?;
    cli.apply_overrides(&mut config);

    info!("Mode: {:?}", config.cache.mode);
    info!("Seeds: {}", config.network.seeds.join(", "));
    info!("Online threshold: {}s", config.network.online_threshold_secs);

    let clients = Arc::new(HttpPodClientFactory::new(
        config.network.rpc_port,
        config.network.rpc_path.clone(),
    ));
    let geo = Arc::new(IpApiProvider::new(config.geo.endpoint.clone()));
    let state = Arc::new(AppState::new(&config, clients, geo));

    let sweeper = state.caches.spawn_sweeper(config.cache.sweep_interval());

    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api.http_port));
    info!("API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("pnode-monitor stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
