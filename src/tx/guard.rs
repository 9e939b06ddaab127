//! Single-flight guard for send attempts
//!
//! Two attempts for the same account would read the same nonce and race each
//! other to the node. The guard admits one attempt per account at a time and
//! rejects the rest immediately.

use crate::error::{WalletError, WalletResult};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ethers::types::Address;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Tracks which accounts have an attempt in flight
#[derive(Clone, Default)]
pub struct SingleFlight {
    /// account -> id of the attempt holding it
    in_flight: Arc<DashMap<Address, Uuid>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the account for `attempt_id`, failing if another attempt holds it
    pub fn try_acquire(&self, account: Address, attempt_id: Uuid) -> WalletResult<FlightPermit> {
        match self.in_flight.entry(account) {
            Entry::Occupied(holder) => {
                debug!(
                    "Attempt {} rejected, {} already in flight for {:?}",
                    attempt_id,
                    holder.get(),
                    account
                );
                Err(WalletError::SendInFlight { account })
            }
            Entry::Vacant(slot) => {
                slot.insert(attempt_id);
                Ok(FlightPermit {
                    in_flight: self.in_flight.clone(),
                    account,
                    attempt_id,
                })
            }
        }
    }

    #[cfg(test)]
    pub fn is_in_flight(&self, account: &Address) -> bool {
        self.in_flight.contains_key(account)
    }
}

/// Held for the lifetime of one attempt; releases the account on drop
pub struct FlightPermit {
    in_flight: Arc<DashMap<Address, Uuid>>,
    account: Address,
    attempt_id: Uuid,
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        self.in_flight
            .remove_if(&self.account, |_, holder| *holder == self.attempt_id);
    }
}
