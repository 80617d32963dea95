//! Live-stream relay.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client  GET /<percent-encoded URL>
//!        │
//!        ▼
//!   ┌──────────┐   no target   ┌──────────────┐
//!   │ dispatch │──────────────▶│ config page  │
//!   └────┬─────┘               └──────────────┘
//!        │ target + streaming flag
//!        ▼
//!   ┌──────────┐  headers  ┌──────────────┐  attempt  ┌──────────┐
//!   │  retry   │──────────▶│ header policy│──────────▶│ upstream │
//!   │controller│◀──────────┴──────────────┴───────────│  (HTTP)  │
//!   └────┬─────┘   2xx/3xx · 4xx · 5xx/transport      └──────────┘
//!        ▼
//!   ┌──────────┐
//!   │ finisher │  ordinary | streaming, no-cache + CORS
//!   └──────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use stream_relay::config::{apply_overrides, load_config, ConfigOverrides, ProxyConfig};
use stream_relay::lifecycle::{signals::shutdown_signal, Shutdown};
use stream_relay::observability::{logging, metrics};
use stream_relay::HttpServer;

#[derive(Parser)]
#[command(name = "stream-relay")]
#[command(about = "Reverse proxy for live-streaming media URLs", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override observability.log_level.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    let config = apply_overrides(
        config,
        ConfigOverrides {
            bind_address: cli.bind,
            log_level: cli.log_level,
        },
    )?;

    logging::init(&config.observability);
    tracing::info!("stream-relay v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_attempts = config.retries.max_attempts,
        initial_delay_ms = config.retries.initial_delay_ms,
        max_delay_ms = config.retries.max_delay_ms,
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
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let server_shutdown = shutdown.subscribe();

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
