use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::signal;
use tracing::{info, warn};

use cosmos_node_exporter::api::create_router;
use cosmos_node_exporter::app::{AppState, ExporterService, WorkerConfig, spawn_workers};
use cosmos_node_exporter::config::{ExporterConfig, RefreshMode};
use cosmos_node_exporter::infra::{
    FileAddressBook, MetricStore, ProcNetConnectionTable, RestClientConfig, RestNodeClient,
    init_tracing,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = ExporterConfig::from_args()?;
    init_tracing(config.log_format)?;

    info!(
        listen_address = %config.listen_address,
        api_base_url = %config.api_base_url,
        address_book = %config.address_book_path.display(),
        refresh_mode = ?config.refresh_mode,
        peer_port = config.peer_port,
        track_validators = config.track_validators,
        "Starting cosmos node exporter"
    );

    // Instantiate infrastructure components
    let node_api = RestNodeClient::new(
        &config.api_base_url,
        RestClientConfig {
            timeout: config.request_timeout,
        },
    )?;
    let address_book = FileAddressBook::new(&config.address_book_path);
    let connections = ProcNetConnectionTable::new();
    let metrics = Arc::new(MetricStore::new(config.track_validators));

    let service = Arc::new(ExporterService::new(
        Arc::new(node_api),
        Arc::new(address_book),
        Arc::new(connections),
        metrics,
        config.peer_port,
    ));

    let workers = match config.refresh_mode {
        RefreshMode::Interval => Some(spawn_workers(
            Arc::clone(&service),
            WorkerConfig {
                refresh_interval: config.refresh_interval,
            },
        )),
        RefreshMode::Scrape => None,
    };

    let app_state = Arc::new(AppState::new(service, config.refresh_mode));
    let router = create_router(app_state);

    let listener = tokio::net::TcpListener::bind(config.listen_address)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_address))?;

    info!(address = %config.listen_address, "Serving metrics on /metrics");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some((handles, shutdown_tx)) = workers {
        let _ = shutdown_tx.send(true);
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Refresh worker ended abnormally");
            }
        }
    }

    info!("Exporter stopped");
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received");
}
