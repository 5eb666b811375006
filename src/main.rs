//! TierKV - line-protocol key-value server
//!
//! Serves GET/SET/PING over TCP from a cache layered over a durable
//! RocksDB authority.

// Use jemalloc for better multi-threaded performance
#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::sync::Arc;
use tierkv::config::Config;
use tierkv::health::HealthServer;
use tierkv::metrics::Metrics;
use tierkv::server::Server;
use tierkv::storage;
use tokio::runtime::Builder;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting TierKV");

    // Load configuration
    let config = if let Some(config_path) = std::env::args().nth(1) {
        info!("Loading configuration from {}", config_path);
        Config::from_file(&config_path)?
    } else {
        info!("Using default configuration (set TIERKV_* env vars to customize)");
        Config::from_env()?
    };

    info!("Configuration: {:?}", config);

    let mut runtime_builder = Builder::new_multi_thread();
    if config.server.worker_threads > 0 {
        runtime_builder.worker_threads(config.server.worker_threads);
        info!("Using {} worker threads", config.server.worker_threads);
    }
    let runtime = runtime_builder.enable_all().build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: Config) -> anyhow::Result<()> {
    let cancel_token = CancellationToken::new();

    let store = storage::build(&config.storage)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {e}"))?;

    let metrics = Arc::new(Metrics::new());

    let health_server = if config.metrics.enabled {
        let health = Arc::new(HealthServer::new(Arc::clone(&metrics)));
        let metrics_config = config.metrics.clone();
        let health_task = Arc::clone(&health);
        let health_cancel = cancel_token.clone();
        tokio::spawn(async move {
            if let Err(e) = health_task.run(metrics_config, health_cancel).await {
                error!("Health server error: {}", e);
            }
        });
        Some(health)
    } else {
        None
    };

    let server = Arc::new(Server::new(
        config.server.clone(),
        store,
        Arc::clone(&metrics),
        cancel_token.clone(),
    ));

    if let Some(ref health) = health_server {
        health.set_ready(true);
        info!("Server is ready");
    }

    // Setup signal handlers
    let cancel_for_signal = cancel_token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        cancel_for_signal.cancel();
    });

    if let Err(e) = server.run().await {
        error!("Server error: {}", e);
    }

    if let Some(health) = health_server {
        health.set_ready(false);
    }

    info!("TierKV stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received SIGINT, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                info!("Received SIGINT, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received SIGINT, shutting down...");
    }
}
