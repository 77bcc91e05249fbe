//! CLI for RelayHub
//!
//! Loads `.env`, the configuration file and the environment, then serves
//! WebSocket upgrades until interrupted.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use relayhub::config::{Settings, load_config_from};
use relayhub::hub::Hub;
use relayhub::transport::{JwtAuthenticator, start_websocket_server};
use relayhub::utils::logging;
use tracing::{debug, error, info};

const STATS_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "relayhub", about = "Real-time multi-device delivery hub")]
struct Cli {
    /// Configuration file, without extension
    #[arg(long, default_value = "config/default")]
    config: String,
    /// Overrides `server.log_level`; `RUST_LOG` still wins
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = match load_config_from(&cli.config) {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    logging::init(cli.log_level.as_deref().unwrap_or(&settings.server.log_level));

    if let Err(e) = run_server(settings).await {
        error!("Server failed: {e}");
        std::process::exit(1);
    }
}

async fn run_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let authenticator = Arc::new(JwtAuthenticator::from_settings(&settings.auth)?);
    let hub = Arc::new(Hub::new());
    tokio::spawn(log_stats(hub.clone()));

    tokio::select! {
        result = start_websocket_server(&addr, hub.clone(), settings, authenticator) => {
            result?;
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            let stats = hub.stats();
            info!(
                users = stats.users,
                connections = stats.connections,
                "Shutdown signal received. Exiting gracefully."
            );
        }
    }

    Ok(())
}

async fn log_stats(hub: Arc<Hub>) {
    let mut ticker = tokio::time::interval(STATS_INTERVAL);
    loop {
        ticker.tick().await;
        let stats = hub.stats();
        debug!(
            users = stats.users,
            connections = stats.connections,
            topics = stats.topics,
            "hub stats"
        );
    }
}
