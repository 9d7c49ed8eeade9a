use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use shunt::{discovery, load_config, observability, ProxyConfig, ProxyServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "shunt", about = "Health-aware, circuit-breaking load-balancing proxy")]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Config before tracing would be nicer, but load errors need a logger.
    // Bootstrap with the default level, the env filter still wins.
    let config = match &args.config {
        Some(path) => {
            observability::init_tracing("info");
            load_config(path)?
        }
        None => {
            let config = ProxyConfig::default();
            observability::init_tracing(&config.observability.log_level);
            tracing::warn!("No config file given, starting with defaults (no routes)");
            config
        }
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        services = config.services.len(),
        "shunt starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr)?,
            Err(e) => {
                tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    error = %e,
                    "Failed to parse metrics address, metrics disabled"
                );
            }
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let shutdown = Shutdown::new();

    let server = ProxyServer::new(config);

    // Discovery feed: events pushed into this channel mutate the pool.
    // Sources (DNS watchers, control-plane clients) send into `events_tx`.
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let applier = discovery::spawn_applier(server.pool(), events_rx, shutdown.subscribe());
    // Keeping the sender alive keeps the applier running until shutdown.
    let _events_tx = events_tx;

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            return;
        }
        tracing::info!("Ctrl+C received, shutting down");
        signal_shutdown.trigger();
    });

    server.run(listener, shutdown).await?;
    let _ = applier.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
