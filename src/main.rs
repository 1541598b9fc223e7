//! hostgate binary: load configuration, register what it describes, serve
//! until Ctrl+C.

use std::path::PathBuf;
use clap::Parser;

use hostgate::config::{load_config, ServerConfig};
use hostgate::observability::{logging, metrics};
use hostgate::Server;

#[derive(Parser)]
#[command(name = "hostgate")]
#[command(about = "Multi-tenant HTTP/HTTPS/WebSocket front end", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level; overrides the configuration, `RUST_LOG` overrides both.
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.observability.log_level);
    logging::init(level);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "hostgate starting");
    tracing::info!(
        http_address = %config.listener.http_address,
        https = config.listener.https.is_some(),
        host_roots = config.host_roots.len(),
        static_mounts = config.static_mounts.len(),
        websocket_relays = config.websocket_relays.len(),
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

    let server = Server::from_config(config)?;
    server.run_until(shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C; shutting down"),
    }
}
