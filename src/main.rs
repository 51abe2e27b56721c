//! Oracle Price Monitor — Entry Point
//!
//! Polls Pyth Hermes for the configured feeds and serves the dashboard
//! API until SIGINT.
//!
//! Wiring sequence:
//! 1. Read `.env`, load config.toml (`CONFIG_PATH`) + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Create HermesClient (HTTP + outbound rate limit)
//! 4. Start the FeedClient driver (timer + backoff + refresh)
//! 5. Spawn the metrics exporter following client snapshots
//! 6. Spawn the dashboard server (/api, /live, /ready, /metrics)
//! 7. Wait for SIGINT → stop server, exporter and client

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use oracle_price_monitor::adapters::dashboard::{DashboardServer, DashboardState};
use oracle_price_monitor::adapters::hermes::{HermesClient, HermesClientConfig};
use oracle_price_monitor::adapters::metrics::MetricsRegistry;
use oracle_price_monitor::config;
use oracle_price_monitor::usecases::FeedClient;

/// Environment variable overriding the config file location.
const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    dotenv::dotenv().ok();
    let config_path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".to_string());
    let config = config::loader::load_config(&config_path)
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.service.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        base_url = %config.oracle.base_url,
        feeds = config.feeds.len(),
        "Starting oracle price monitor"
    );

    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    // ── 3. Oracle adapter ───────────────────────────────────
    let hermes = HermesClient::new(HermesClientConfig::from(&config.oracle))
        .context("Failed to create Hermes client")?;

    // ── 4. Feed client driver ───────────────────────────────
    let client = Arc::new(FeedClient::new(
        Arc::new(hermes),
        config.feeds.clone(),
        config.polling,
    ));
    let (handle, polling_task) = client.start();

    // ── 5. Metrics exporter ─────────────────────────────────
    let metrics = if config.server.metrics_enabled {
        Some(Arc::new(
            MetricsRegistry::new().context("Failed to register metrics")?,
        ))
    } else {
        None
    };
    let exporter_handle = metrics.as_ref().map(|registry| {
        let registry = Arc::clone(registry);
        let snapshots = handle.subscribe();
        let exporter_shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move { registry.follow(snapshots, exporter_shutdown).await })
    });

    // ── 6. Dashboard server ─────────────────────────────────
    let server = DashboardServer::new(
        DashboardState {
            client: handle.clone(),
            metrics,
        },
        config.server.bind_address.clone(),
    );
    let server_shutdown = shutdown_tx.subscribe();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run(server_shutdown).await {
            error!(error = %e, "Dashboard server failed");
        }
    });

    info!("All tasks spawned — monitor is running");

    // ── 7. Wait for SIGINT ──────────────────────────────────
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for SIGINT, shutting down");
    } else {
        info!("SIGINT received, initiating graceful shutdown");
    }

    let _ = shutdown_tx.send(());
    polling_task.stop().await;

    if let Some(exporter) = exporter_handle {
        let _ = exporter.await;
    }
    if tokio::time::timeout(Duration::from_secs(5), server_handle)
        .await
        .is_err()
    {
        warn!("Dashboard server did not stop within 5s");
    }

    info!("Shutdown complete");
    Ok(())
}
