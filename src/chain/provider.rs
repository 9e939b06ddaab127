//! Chain provider with multi-RPC support and automatic failover

use super::NetworkClient;
use crate::config::ChainConfig;
use crate::error::{WalletError, WalletResult};

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, Provider, ProviderError, RpcError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Multi-provider wrapper with automatic failover
pub struct ChainProvider {
    /// Chain configuration
    config: ChainConfig,
    /// HTTP providers (multiple for failover)
    http_providers: Vec<Provider<Http>>,
    /// Current active provider index
    current_provider: AtomicUsize,
}

impl ChainProvider {
    /// Create a new chain provider
    pub fn new(config: ChainConfig) -> WalletResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| WalletError::Config(format!("HTTP client: {}", e)))?;

        let mut http_providers = Vec::new();

        for url in &config.rpc_urls {
            match reqwest::Url::parse(url) {
                Ok(parsed) => {
                    let transport = Http::new_with_client(parsed, client.clone());
                    http_providers.push(Provider::new(transport));
                    debug!("Added HTTP provider for chain {}: {}", config.chain_id, url);
                }
                Err(e) => {
                    warn!("Failed to create provider for {}: {}", url, e);
                }
            }
        }

        if http_providers.is_empty() {
            return Err(WalletError::Config(format!(
                "No valid RPC providers for chain {}",
                config.chain_id
            )));
        }

        info!(
            "Chain {} ({}) configured with {} RPC endpoint(s)",
            config.name,
            config.chain_id,
            http_providers.len()
        );

        Ok(Self {
            config,
            http_providers,
            current_provider: AtomicUsize::new(0),
        })
    }

    /// Get the active HTTP provider
    pub fn http(&self) -> &Provider<Http> {
        let idx = self.current_provider.load(Ordering::Relaxed);
        &self.http_providers[idx % self.http_providers.len()]
    }

    /// Switch to next available provider
    pub fn failover(&self) {
        let current = self.current_provider.load(Ordering::Relaxed);
        let next = (current + 1) % self.http_providers.len();
        self.current_provider.store(next, Ordering::Relaxed);
        warn!(
            "Chain {} failover to provider {}",
            self.config.chain_id, next
        );
    }

    /// Chain name from configuration
    pub fn name(&self) -> &str {
        &self.config.name
    }

    fn connection_error(&self, operation: &'static str, message: String) -> WalletError {
        WalletError::ChainConnection {
            chain_id: self.config.chain_id,
            operation,
            message,
        }
    }
}

/// Run a read against each provider in turn until one answers
macro_rules! with_failover {
    ($self:ident, $operation:literal, |$provider:ident| $call:expr) => {{
        let mut last_error = String::from("no providers tried");
        for _ in 0..$self.http_providers.len() {
            let $provider = $self.http();
            match $call.await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(
                        "{} failed on chain {}: {}",
                        $operation, $self.config.chain_id, e
                    );
                    last_error = e.to_string();
                    $self.failover();
                }
            }
        }
        Err($self.connection_error($operation, last_error))
    }};
}

impl ChainProvider {
    /// Raw transaction count, range-checked by the caller
    async fn transaction_count(&self, address: Address) -> WalletResult<U256> {
        with_failover!(self, "get_transaction_count", |provider| provider
            .get_transaction_count(address, None))
    }
}

#[async_trait]
impl NetworkClient for ChainProvider {
    fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    async fn block_number(&self) -> WalletResult<u64> {
        with_failover!(self, "get_block_number", |provider| async {
            provider.get_block_number().await.map(|b| b.as_u64())
        })
    }

    async fn get_balance(&self, address: Address) -> WalletResult<U256> {
        with_failover!(self, "get_balance", |provider| provider
            .get_balance(address, None))
    }

    async fn get_transaction_count(&self, address: Address) -> WalletResult<u64> {
        let count = self.transaction_count(address).await?;
        if count > U256::from(u64::MAX) {
            return Err(self.connection_error(
                "get_transaction_count",
                format!("node reported transaction count {} beyond u64", count),
            ));
        }
        Ok(count.as_u64())
    }

    async fn get_latest_base_fee(&self) -> WalletResult<Option<U256>> {
        with_failover!(self, "get_block", |provider| async {
            provider
                .get_block(BlockNumber::Latest)
                .await
                .map(|block| block.and_then(|b| b.base_fee_per_gas))
        })
    }

    /// Broadcast is never retried against another endpoint
    async fn send_raw_transaction(&self, raw: Bytes) -> WalletResult<H256> {
        match self.http().send_raw_transaction(raw).await {
            Ok(pending) => Ok(pending.tx_hash()),
            Err(e) => Err(classify_broadcast_error(self.config.chain_id, e)),
        }
    }
}

/// A JSON-RPC error response is the node refusing the transaction; anything
/// else never reached the node's validation.
fn classify_broadcast_error(chain_id: u64, error: ProviderError) -> WalletError {
    match RpcError::as_error_response(&error) {
        Some(response) => WalletError::BroadcastRejected {
            chain_id,
            reason: response.message.clone(),
        },
        None => WalletError::ChainConnection {
            chain_id,
            operation: "send_raw_transaction",
            message: error.to_string(),
        },
    }
}
