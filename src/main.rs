//! Bitcoin wallet gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────────┐
//!                         │                   WALLET GATEWAY                     │
//!                         │                                                      │
//!   Mobile client         │  ┌─────────┐    ┌───────────────┐                    │
//!   ──────────────────────┼─▶│  http   │───▶│ WalletService │                    │
//!                         │  │ server  │    └──────┬────────┘                    │
//!                         │  └─────────┘           │                             │
//!                         │            ┌───────────┼──────────────┐              │
//!                         │            ▼           ▼              ▼              │
//!                         │     ┌────────────┐ ┌──────────┐ ┌──────────────┐     │
//!                         │     │provisioning│ │ balance  │ │ transaction  │     │
//!                         │     │ + store    │ │ resolver │ │  resolver    │     │
//!                         │     └─────┬──────┘ └────┬─────┘ └──────┬───────┘     │
//!                         │           │             └──────┬───────┘             │
//!                         │           ▼                    ▼                     │
//!                         │     address API        resilience::FallbackChain     │
//!                         │     (BlockCypher)      (timeout per attempt)         │
//!                         │                                │                     │
//!                         │                                ▼                     │
//!                         │              blockchain.info / Blockstream /         │
//!                         │              mempool.space / BlockCypher             │
//!                         │                                                      │
//!                         │  ┌────────────────────────────────────────────────┐  │
//!                         │  │  config · observability · lifecycle            │  │
//!                         │  └────────────────────────────────────────────────┘  │
//!                         └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use btc_wallet_gateway::config::{load_config, WalletConfig};
use btc_wallet_gateway::identity::StaticSessions;
use btc_wallet_gateway::lifecycle::{spawn_signal_handler, Shutdown};
use btc_wallet_gateway::observability::{logging, metrics};
use btc_wallet_gateway::{HttpServer, WalletService};

#[derive(Parser)]
#[command(name = "btc-wallet-gateway")]
#[command(about = "HTTP gateway for Bitcoin wallet provisioning and balance resolution", long_about = None)]
struct Args {
    /// Configuration file (defaults are used when omitted)
    #[arg(short, long, env = "WALLET_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => WalletConfig::default(),
    };

    logging::init_logging(&config.observability).map_err(|e| e as Box<dyn std::error::Error>)?;

    tracing::info!("btc-wallet-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config = ?args.config,
        network = %config.network,
        bind_address = %config.server.bind_address,
        provider_timeout_secs = config.providers.timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let service = Arc::new(WalletService::from_config(&config)?);

    let sessions = StaticSessions::from_config(&config.auth);
    if sessions.is_empty() {
        tracing::warn!("No sessions configured in [auth.sessions]; every wallet request will be rejected");
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    HttpServer::new(&config.server, service, Arc::new(sessions))
        .run(listener, shutdown)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
