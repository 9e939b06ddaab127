//! Chain module - the network collaborator the wallet reads from and broadcasts to
//!
//! This module provides:
//! - The `NetworkClient` capability used by the send pipeline
//! - An ethers-backed provider with multi-RPC failover
//! - Concurrent account state reads (nonce + latest base fee)

pub mod account;
pub mod provider;

pub use account::AccountStateFetcher;
pub use provider::ChainProvider;

use crate::error::WalletResult;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};

/// Operations the wallet consumes from an Ethereum JSON-RPC node
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// Chain ID transactions are built for
    fn chain_id(&self) -> u64;

    /// Current block number, used for health checks
    async fn block_number(&self) -> WalletResult<u64>;

    /// Balance of an account in wei
    async fn get_balance(&self, address: Address) -> WalletResult<U256>;

    /// Transaction count (next nonce) of an account at the latest block
    async fn get_transaction_count(&self, address: Address) -> WalletResult<u64>;

    /// Base fee of the latest block; `None` when the block carries none
    async fn get_latest_base_fee(&self) -> WalletResult<Option<U256>>;

    /// Submit a signed raw transaction, returning its hash
    async fn send_raw_transaction(&self, raw: Bytes) -> WalletResult<H256>;
}
