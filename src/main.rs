//! WebSocket Worker Bridge (v1)
//!
//! Accepts HTTP calls and hands each one to a connected WebSocket worker,
//! returning the worker's reply as the HTTP response.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────┐
//!                          │                  WS BRIDGE                   │
//!                          │                                              │
//!   POST /send_application/│  ┌─────────┐   ┌────────────┐   ┌─────────┐  │
//!   ───────────────────────┼─▶│  http   │──▶│   bridge   │──▶│  pool   │  │
//!                          │  │ server  │   │ dispatcher │   │registry │  │
//!                          │  └─────────┘   └─────┬──────┘   └────┬────┘  │
//!                          │                      │ envelope      │ lease │
//!   Caller response        │                      ▼               ▼       │
//!   ◀──────────────────────┼──────────────── reply frame ◀── worker socket ◀──── GET /ws
//!                          │                                              │       Worker
//!                          │  ┌────────────────────────────────────────┐  │
//!                          │  │ config · resilience · observability ·  │  │
//!                          │  │ lifecycle                              │  │
//!                          │  └────────────────────────────────────────┘  │
//!                          └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use ws_bridge::config::{load_config, validate_config, BridgeConfig, ConfigError};
use ws_bridge::lifecycle::{wait_for_signal, Shutdown};
use ws_bridge::observability::init_logging;
use ws_bridge::BridgeServer;

#[derive(Parser)]
#[command(name = "ws-bridge")]
#[command(about = "Bridge HTTP calls to a pool of WebSocket workers", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override `observability.log_level`.
    #[arg(short, long)]
    log_level: Option<String>,
}

fn resolve_config(cli: &Cli) -> Result<BridgeConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BridgeConfig::default(),
    };

    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
    }
    if let Some(level) = &cli.log_level {
        config.observability.log_level = level.clone();
    }

    // Overrides bypass the loader, so check again.
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    init_logging(&config.observability.log_level);

    tracing::info!("ws-bridge v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        acquire_ms = config.timeouts.acquire_ms,
        reply_secs = config.timeouts.reply_secs,
        retries = config.retries.enabled,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    let server = BridgeServer::new(config);
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
