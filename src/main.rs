//! Circuit-breaking reverse-proxy gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                    GATEWAY                        │
//!   Client Request     │  ┌─────────┐   ┌──────────────┐   ┌───────────┐  │
//!   ───────────────────┼─▶│  http   │──▶│   breaker    │──▶│  upstream │──┼──▶ Upstream
//!                      │  │ server  │   │   admit?     │   │   call    │  │     API
//!                      │  └─────────┘   └──────┬───────┘   └─────┬─────┘  │
//!                      │                       │ no: 503         │        │
//!   Client Response    │  ┌─────────┐          ▼                 ▼        │
//!   ◀──────────────────┼──│ relay / │◀──── report success / failure ◀─────┼─── response
//!                      │  │ 502/504 │                                     │    or error
//!                      │  └─────────┘                                     │
//!                      └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use circuit_gateway::config::{read_config, GatewayConfig};
use circuit_gateway::observability::{logging, metrics};
use circuit_gateway::{GatewayServer, Shutdown};

#[derive(Parser)]
#[command(name = "circuit-gateway")]
#[command(about = "Reverse proxy with a per-endpoint circuit breaker", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(long)]
    bind: Option<String>,

    /// Override upstream.base_url.
    #[arg(long)]
    upstream: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(upstream) = cli.upstream {
        config.upstream.base_url = upstream;
    }

    logging::init_logging(&config.observability);
    tracing::info!("circuit-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    // Validates the final configuration, overrides included.
    let server = GatewayServer::new(config)?;
    let config = server.config();

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        request_timeout_ms = config.upstream.request_timeout_ms,
        fail_threshold = config.breaker.fail_threshold,
        cooldown_ms = config.breaker.cooldown_ms,
        half_open = ?config.breaker.half_open,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
