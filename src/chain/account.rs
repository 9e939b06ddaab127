//! Account state reads performed at the start of every send attempt

use super::NetworkClient;
use crate::error::WalletResult;

use ethers::types::{Address, U256};
use futures::future::try_join;
use tracing::debug;

/// Nonce and fee market observed for one send attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    /// Next nonce expected from the account
    pub nonce: u64,
    /// Base fee of the latest block, if the block reported one
    pub base_fee: Option<U256>,
}

/// Fetches per-attempt account state from the network
pub struct AccountStateFetcher<'a> {
    network: &'a dyn NetworkClient,
}

impl<'a> AccountStateFetcher<'a> {
    pub fn new(network: &'a dyn NetworkClient) -> Self {
        Self { network }
    }

    /// Read nonce and latest base fee concurrently
    pub async fn fetch(&self, account: Address) -> WalletResult<AccountSnapshot> {
        let (nonce, base_fee) = try_join(
            self.network.get_transaction_count(account),
            self.network.get_latest_base_fee(),
        )
        .await?;

        debug!(
            "Account {:?} on chain {}: nonce={} base_fee={:?}",
            account,
            self.network.chain_id(),
            nonce,
            base_fee
        );

        Ok(AccountSnapshot { nonce, base_fee })
    }
}
