//! Error types for the enclave wallet

use ethers::types::Address;
use std::fmt;
use thiserror::Error;

/// Pipeline stage an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Setup,
    Input,
    AccountState,
    Signing,
    Recovery,
    Broadcast,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Setup => "setup",
            Stage::Input => "input",
            Stage::AccountState => "account_state",
            Stage::Signing => "signing",
            Stage::Recovery => "recovery",
            Stage::Broadcast => "broadcast",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the wallet
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed {field}: {message}")]
    MalformedInput {
        field: &'static str,
        message: String,
    },

    #[error("Chain {chain_id} unreachable during {operation}: {message}")]
    ChainConnection {
        chain_id: u64,
        operation: &'static str,
        message: String,
    },

    #[error("Remote signer unavailable: {0}")]
    SignerUnavailable(String),

    #[error("Remote signer rejected request: {0}")]
    SignerRejected(String),

    #[error("Signature does not recover to account {expected:?} under either recovery id")]
    RecoveryFailed { expected: Address },

    #[error("Broadcast rejected by chain {chain_id}: {reason}")]
    BroadcastRejected { chain_id: u64, reason: String },

    #[error("A transfer for account {account:?} is already in flight")]
    SendInFlight { account: Address },

    #[error("Transfer attempt abandoned during {stage}")]
    Abandoned { stage: Stage },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WalletError {
    /// Stage of the send pipeline that produced this error
    pub fn stage(&self) -> Stage {
        match self {
            WalletError::Config(_) | WalletError::Internal(_) => Stage::Setup,
            WalletError::MalformedInput { .. } | WalletError::SendInFlight { .. } => Stage::Input,
            WalletError::ChainConnection { operation, .. } => {
                if *operation == "send_raw_transaction" {
                    Stage::Broadcast
                } else {
                    Stage::AccountState
                }
            }
            WalletError::SignerUnavailable(_) | WalletError::SignerRejected(_) => Stage::Signing,
            WalletError::RecoveryFailed { .. } => Stage::Recovery,
            WalletError::BroadcastRejected { .. } => Stage::Broadcast,
            WalletError::Abandoned { stage } => *stage,
        }
    }

    /// Check if error is worth retrying with a fresh attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WalletError::ChainConnection { .. }
                | WalletError::SignerUnavailable(_)
                | WalletError::SendInFlight { .. }
        )
    }
}

/// Result type for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;
