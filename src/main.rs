//! Enclave Wallet - EIP-1559 transfers signed by a remote enclave
//!
//! The wallet builds value transfers, has their digests signed by an external
//! signing service that never exposes the key, recovers the missing recovery
//! id against the known account and broadcasts the result.

use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

mod api;
mod chain;
mod config;
mod error;
mod metrics;
mod signer;
mod tx;

use chain::{ChainProvider, NetworkClient};
use config::Settings;
use metrics::MetricsServer;
use signer::{AddressProvider, HttpSigner};
use tx::{AbandonSignal, FeeEstimator, TransferPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting Enclave Wallet v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load()?;
    info!(
        "Loaded configuration for chain {} ({})",
        settings.chain.name, settings.chain.chain_id
    );

    let network = Arc::new(ChainProvider::new(settings.chain.clone())?);
    let signer = Arc::new(HttpSigner::new(&settings.signer)?);
    info!("Remote signer at {}", signer.url());

    // The account is fixed for the whole session
    let account = match settings.pinned_address()? {
        Some(address) => address,
        None => signer.address().await?,
    };
    info!("Wallet account: {:?}", account);

    let pipeline = Arc::new(TransferPipeline::new(
        account,
        network.clone(),
        signer,
        FeeEstimator::from_config(&settings.fees),
    ));

    let (shutdown_handle, shutdown) = AbandonSignal::new();

    // Start API server
    let api_handle = tokio::spawn({
        let config = settings.api.clone();
        let pipeline = pipeline.clone();
        async move {
            if let Err(e) = api::run_server(config, pipeline, shutdown).await {
                error!("API server error: {}", e);
            }
        }
    });

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    // Health check loop
    let health_handle = tokio::spawn({
        let network = network.clone();
        let interval = settings.chain.health_check_interval_secs;
        async move {
            loop {
                tokio::time::sleep(tokio::time::Duration::from_secs(interval)).await;

                match network.block_number().await {
                    Ok(block_number) => {
                        metrics::record_block_height(network.chain_id(), block_number);
                        metrics::record_health_check();
                    }
                    Err(e) => {
                        warn!("Chain {} health check failed: {}", network.name(), e);
                        metrics::record_health_check_failure();
                    }
                }
            }
        }
    });

    info!("Enclave Wallet is running");
    info!("API server: http://{}:{}", settings.api.host, settings.api.port);
    if settings.metrics.enabled {
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutdown signal received, stopping...");

    // Transfers not yet broadcast are abandoned
    shutdown_handle.abandon();
    api_handle.abort();
    health_handle.abort();
    if let Some(h) = metrics_handle {
        h.abort();
    }

    info!("Enclave Wallet stopped");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,enclave_wallet=debug,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
