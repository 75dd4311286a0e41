//! Mini CRM — customer records, audience segmentation and simulated campaign
//! delivery for small businesses.
//!
//! Main entry point that wires the store, delivery pipeline and REST API.

use clap::Parser;
use crm_api::ApiServer;
use crm_core::config::AppConfig;
use crm_core::event_bus::tracing_sink;
use crm_management::ManagementState;
use crm_store::MemoryStore;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "mini-crm")]
#[command(about = "Small-business CRM with rule-based campaigns and simulated delivery")]
#[command(version)]
struct Cli {
    /// Config file (without extension is fine; toml/yaml/json are detected)
    #[arg(long, short = 'c')]
    config: Option<String>,

    /// Node identifier (overrides config)
    #[arg(long, env = "MINI_CRM__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "MINI_CRM__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Simulated delivery success rate in [0, 1] (overrides config)
    #[arg(long)]
    success_rate: Option<f64>,

    /// Start with an empty store
    #[arg(long, default_value_t = false)]
    no_seed: bool,

    /// Disable bearer-token auth on /api (development only)
    #[arg(long, default_value_t = false)]
    no_auth: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mini_crm=info,crm_delivery=info,crm_events=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Mini CRM starting up");

    let loaded = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(rate) = cli.success_rate {
        config.delivery.success_rate = rate;
    }
    if cli.no_seed {
        config.seed_demo_data = false;
    }
    if cli.no_auth {
        config.auth.enabled = false;
    }
    config.delivery.validate()?;

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        success_rate = config.delivery.success_rate,
        auth = config.auth.enabled,
        "Configuration loaded"
    );

    let store = Arc::new(MemoryStore::new());
    if config.seed_demo_data {
        store.seed_demo_data();
    }

    let state = ManagementState::new(&config, store, tracing_sink())?;
    let api_server = ApiServer::new(config.clone(), state);

    if config.metrics.enabled {
        if let Err(e) = api_server.start_metrics() {
            error!(error = %e, "Failed to start metrics exporter");
        }
    }

    info!("Mini CRM is ready to serve traffic");

    api_server.start_http().await?;

    Ok(())
}
