//! Virtual-host game proxy (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────────────────────────────────────┐
//!                   │                      VHOST PROXY                      │
//!                   │                                                       │
//!   Client          │  ┌──────────┐   ┌───────────┐   ┌──────────┐          │
//!   ────────────────┼─▶│   net    │──▶│ protocol  │──▶│ routing  │          │
//!                   │  │ listener │   │ handshake │   │  table   │          │
//!                   │  └──────────┘   └───────────┘   └────┬─────┘          │
//!                   │                                      │                │
//!                   │                                      ▼                │
//!                   │                 ┌──────────────────────────────┐      │
//!   ◀───────────────┼─────────────────│ proxy: status │ login relay  │◀─────┼──── Backend
//!                   │                 └──────────────────────────────┘      │
//!                   │                                                       │
//!                   │  config · lifecycle · observability · resilience     │
//!                   └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use vhost_proxy::config::{load_or_init, ProxyConfig};
use vhost_proxy::lifecycle::{self, signals, Shutdown};
use vhost_proxy::observability::logging;
use vhost_proxy::routing::RouteTable;

#[derive(Parser)]
#[command(name = "vhost-proxy", version)]
#[command(about = "Routes game-server handshakes to backends by virtual host", long_about = None)]
struct Cli {
    /// Configuration file (TOML, or JSON by extension). Created with defaults if missing.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Validate the configuration and route table, then exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loaded = load_or_init(&cli.config);
    logging::init(
        loaded
            .as_ref()
            .map(|(c, _)| c.observability.log_level.as_str())
            .unwrap_or("info"),
    );
    let (config, created): (ProxyConfig, bool) = loaded.inspect_err(|e| {
        tracing::error!(path = %cli.config.display(), error = %e, "Failed to load configuration");
    })?;
    if created {
        tracing::info!(path = %cli.config.display(), "Wrote default configuration");
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        "vhost-proxy starting"
    );

    if cli.check {
        let routes = RouteTable::from_config(&config.routes)
            .inspect_err(|e| tracing::error!(error = %e, "Invalid route table"))?;
        tracing::info!(routes = routes.len(), "Configuration OK");
        return Ok(());
    }

    let (server, listener) = lifecycle::start(&config)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Startup failed"))?;

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        let signal = signals::terminate().await;
        tracing::info!(signal, "Shutdown signal received");
        shutdown.trigger();
    });

    server
        .run(listener, receiver)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Listener failed"))?;

    tracing::info!("Shutdown complete");
    Ok(())
}
