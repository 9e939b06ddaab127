//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Transfers submitted and failed (by pipeline stage)
//! - Remote signer latency
//! - Recovery id distribution
//! - Node health

use crate::error::{Stage, WalletError, WalletResult};
use crate::tx::RecoveryId;

use axum::{http::StatusCode, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, CounterVec, Encoder,
    GaugeVec, HistogramVec, TextEncoder,
};
use std::net::SocketAddr;
use tracing::info;

lazy_static! {
    pub static ref TX_SUBMITTED: CounterVec = register_counter_vec!(
        "enclave_wallet_transfers_submitted_total",
        "Total transfers broadcast",
        &["chain_id"]
    ).unwrap();

    pub static ref TX_FAILED: CounterVec = register_counter_vec!(
        "enclave_wallet_transfers_failed_total",
        "Total transfer attempts failed, by pipeline stage",
        &["stage"]
    ).unwrap();

    pub static ref SIGNER_LATENCY: HistogramVec = register_histogram_vec!(
        "enclave_wallet_signer_latency_seconds",
        "Remote signer round trip",
        &[],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();

    pub static ref RECOVERY_IDS: CounterVec = register_counter_vec!(
        "enclave_wallet_recovery_ids_total",
        "Resolved recovery ids",
        &["y_parity"]
    ).unwrap();

    pub static ref MISSING_BASE_FEE: CounterVec = register_counter_vec!(
        "enclave_wallet_missing_base_fee_total",
        "Latest blocks seen without a base fee",
        &[]
    ).unwrap();

    pub static ref CHAIN_BLOCK_HEIGHT: GaugeVec = register_gauge_vec!(
        "enclave_wallet_chain_block_height",
        "Latest block height seen by the health check",
        &["chain_id"]
    ).unwrap();

    pub static ref HEALTH_CHECK_SUCCESS: CounterVec = register_counter_vec!(
        "enclave_wallet_health_check_success_total",
        "Total successful health checks",
        &[]
    ).unwrap();

    pub static ref HEALTH_CHECK_FAILURE: CounterVec = register_counter_vec!(
        "enclave_wallet_health_check_failure_total",
        "Total failed health checks",
        &[]
    ).unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> WalletResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| WalletError::Internal(format!("bind {}: {}", addr, e)))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| WalletError::Internal(format!("metrics server: {}", e)))?;

        Ok(())
    }
}

async fn metrics_handler() -> Result<String, StatusCode> {
    render().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Text exposition of every registered metric
pub fn render() -> WalletResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| WalletError::Internal(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| WalletError::Internal(e.to_string()))
}

// Helper functions to record metrics

pub fn record_tx_submitted(chain_id: u64) {
    TX_SUBMITTED
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}

pub fn record_transfer_failure(stage: Stage) {
    TX_FAILED.with_label_values(&[stage.as_str()]).inc();
}

pub fn record_signer_latency(latency_secs: f64) {
    SIGNER_LATENCY.with_label_values(&[]).observe(latency_secs);
}

pub fn record_recovery_id(recovery_id: RecoveryId) {
    RECOVERY_IDS
        .with_label_values(&[&recovery_id.to_string()])
        .inc();
}

pub fn record_missing_base_fee() {
    MISSING_BASE_FEE.with_label_values(&[]).inc();
}

pub fn record_block_height(chain_id: u64, block_number: u64) {
    CHAIN_BLOCK_HEIGHT
        .with_label_values(&[&chain_id.to_string()])
        .set(block_number as f64);
}

pub fn record_health_check() {
    HEALTH_CHECK_SUCCESS.with_label_values(&[]).inc();
}

pub fn record_health_check_failure() {
    HEALTH_CHECK_FAILURE.with_label_values(&[]).inc();
}
