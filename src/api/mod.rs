//! HTTP API for health checks, account status and transfers

use crate::config::ApiConfig;
use crate::error::{WalletError, WalletResult};
use crate::tx::{AbandonSignal, TransferPipeline, TransferReceipt, TransferRequest};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ethers::types::Address;
use ethers::utils::format_ether;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<TransferPipeline>,
    /// Fires on shutdown; transfers still waiting on the signer give up
    pub shutdown: AbandonSignal,
}

/// Build the API router
pub fn router(pipeline: Arc<TransferPipeline>, shutdown: AbandonSignal) -> Router {
    let state = AppState { pipeline, shutdown };

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/account", get(get_account))
        .route("/transfers", post(create_transfer))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the HTTP API server
pub async fn run_server(
    config: ApiConfig,
    pipeline: Arc<TransferPipeline>,
    shutdown: AbandonSignal,
) -> WalletResult<()> {
    let app = router(pipeline, shutdown);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| WalletError::Config(format!("bind {}: {}", addr, e)))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| WalletError::Internal(format!("API server: {}", e)))?;

    Ok(())
}

/// Health check endpoint - basic liveness
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check - the node must answer
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.pipeline.health_check().await {
        Ok(block_number) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                ready: true,
                chain_id: state.pipeline.chain_id(),
                block_number: Some(block_number),
            }),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                ready: false,
                chain_id: state.pipeline.chain_id(),
                block_number: None,
            }),
        ),
    }
}

/// Account address and balance
async fn get_account(State(state): State<AppState>) -> Result<Json<AccountResponse>, ApiError> {
    let balance = state.pipeline.balance().await?;

    Ok(Json(AccountResponse {
        address: state.pipeline.account(),
        chain_id: state.pipeline.chain_id(),
        balance_wei: balance.to_string(),
        balance_ether: format_ether(balance),
    }))
}

/// Build, sign and broadcast a transfer.
///
/// A client that disconnects drops this future, abandoning the attempt.
async fn create_transfer(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<TransferReceipt>, ApiError> {
    let receipt = state
        .pipeline
        .send_until_abandoned(request, state.shutdown.clone())
        .await?;
    Ok(Json(receipt))
}

/// Wallet error rendered as `{error, stage}`
pub struct ApiError(WalletError);

impl From<WalletError> for ApiError {
    fn from(error: WalletError) -> Self {
        Self(error)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            WalletError::MalformedInput { .. } => StatusCode::BAD_REQUEST,
            WalletError::SendInFlight { .. } => StatusCode::CONFLICT,
            WalletError::SignerUnavailable(_) | WalletError::ChainConnection { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            WalletError::SignerRejected(_) | WalletError::RecoveryFailed { .. } => {
                StatusCode::BAD_GATEWAY
            }
            WalletError::BroadcastRejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            WalletError::Abandoned { .. } => StatusCode::REQUEST_TIMEOUT,
            WalletError::Config(_) | WalletError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.0.to_string(),
            stage: self.0.stage().as_str(),
        };
        (self.status(), Json(body)).into_response()
    }
}

// Response types

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    chain_id: u64,
    block_number: Option<u64>,
}

#[derive(Serialize)]
struct AccountResponse {
    address: Address,
    chain_id: u64,
    balance_wei: String,
    balance_ether: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    stage: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::test_support::{self, FakeNetwork, WalletSigner};
    use crate::tx::FeeEstimator;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use ethers::signers::Signer;
    use ethers::types::U256;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(network: Arc<FakeNetwork>) -> Router {
        let pipeline = TransferPipeline::new(
            test_support::wallet().address(),
            network,
            Arc::new(WalletSigner::new(test_support::wallet())),
            FeeEstimator::new(),
        );
        router(Arc::new(pipeline), AbandonSignal::never())
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn transfer(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/transfers")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(Arc::new(FakeNetwork::new(0, None)))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_account_reports_balance() {
        let response = app(Arc::new(FakeNetwork::new(0, None)))
            .oneshot(Request::get("/account").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["chain_id"], 11_155_111);
        assert_eq!(body["balance_wei"], U256::exp10(18).to_string());
        assert_eq!(body["balance_ether"], "1.000000000000000000");
    }

    #[tokio::test]
    async fn test_transfer_returns_receipt() {
        let network = Arc::new(FakeNetwork::new(9, Some(U256::from(1_000_000_000u64))));
        let response = app(network.clone())
            .oneshot(transfer(json!({
                "recipient": format!("0x{}", "aa".repeat(20)),
                "amount": "0.5"
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["nonce"], 9);
        assert!(body["tx_hash"].as_str().unwrap().starts_with("0x"));
        assert_eq!(network.broadcasts().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_transfer_is_bad_request() {
        let network = Arc::new(FakeNetwork::new(0, None));
        let response = app(network.clone())
            .oneshot(transfer(json!({
                "recipient": format!("0x{}", "aa".repeat(20)),
                "amount": "-3"
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["stage"], "input");
        assert!(body["error"].as_str().unwrap().contains("amount"));
        assert!(network.broadcasts().is_empty());
    }

    #[tokio::test]
    async fn test_transfer_after_shutdown_is_abandoned() {
        let network = Arc::new(FakeNetwork::new(0, Some(U256::from(1_000_000_000u64))));
        let pipeline = TransferPipeline::new(
            test_support::wallet().address(),
            network.clone(),
            Arc::new(WalletSigner::new(test_support::wallet())),
            FeeEstimator::new(),
        );
        let (handle, shutdown) = AbandonSignal::new();
        handle.abandon();

        let response = router(Arc::new(pipeline), shutdown)
            .oneshot(transfer(json!({
                "recipient": format!("0x{}", "aa".repeat(20)),
                "amount": "1"
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(json_body(response).await["stage"], "signing");
        assert!(network.broadcasts().is_empty());
    }

    #[test]
    fn test_error_statuses() {
        let status = |e: WalletError| ApiError::from(e).status();

        assert_eq!(
            status(WalletError::SendInFlight {
                account: Address::zero()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(WalletError::SignerUnavailable("timeout".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(WalletError::RecoveryFailed {
                expected: Address::zero()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status(WalletError::BroadcastRejected {
                chain_id: 1,
                reason: "insufficient funds".into()
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
