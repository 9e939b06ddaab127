//! Recovery id resolution for signatures returned without one
//!
//! The remote signer only hands back `(r, s)`. Of the two public keys those
//! values can recover to, exactly one belongs to the account; the matching
//! y-parity is what goes into the signed transaction.

use super::types::{Digest, RawSignature};
use crate::error::{WalletError, WalletResult};

use ethers::types::{Address, Signature, SignatureError};
use std::fmt;
use tracing::debug;

/// y-parity of the signature's `R` point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecoveryId {
    Even,
    Odd,
}

impl RecoveryId {
    /// Every candidate, in the order they are tried
    pub const ALL: [RecoveryId; 2] = [RecoveryId::Even, RecoveryId::Odd];

    pub fn y_parity(self) -> u8 {
        match self {
            RecoveryId::Even => 0,
            RecoveryId::Odd => 1,
        }
    }

    #[cfg(test)]
    pub fn from_y_parity(parity: u8) -> Option<Self> {
        match parity {
            0 => Some(RecoveryId::Even),
            1 => Some(RecoveryId::Odd),
            _ => None,
        }
    }
}

impl fmt::Display for RecoveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.y_parity())
    }
}

/// Signature known to recover to the account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSignature {
    pub signature: RawSignature,
    pub recovery_id: RecoveryId,
}

/// Address recovered from `(digest, r, s)` under one candidate parity
pub fn recover_address(
    digest: &Digest,
    signature: &RawSignature,
    candidate: RecoveryId,
) -> Result<Address, SignatureError> {
    Signature {
        r: signature.r,
        s: signature.s,
        v: u64::from(candidate.y_parity()),
    }
    .recover(digest.as_h256())
}

/// Matches signer output against the session's account
pub struct RecoveryResolver {
    account: Address,
}

impl RecoveryResolver {
    pub fn new(account: Address) -> Self {
        Self { account }
    }

    /// Find the recovery id under which `raw` recovers to the account.
    ///
    /// High-`s` input is normalised first; the returned signature is the one
    /// to encode.
    pub fn resolve(&self, digest: &Digest, raw: &RawSignature) -> WalletResult<ResolvedSignature> {
        let signature = raw.normalized();
        if signature != *raw {
            debug!("Normalised high-s signature for digest {}", digest);
        }

        for candidate in RecoveryId::ALL {
            match recover_address(digest, &signature, candidate) {
                Ok(recovered) if recovered == self.account => {
                    debug!("Digest {} resolved with recovery id {}", digest, candidate);
                    crate::metrics::record_recovery_id(candidate);
                    return Ok(ResolvedSignature {
                        signature,
                        recovery_id: candidate,
                    });
                }
                Ok(recovered) => {
                    debug!(
                        "Recovery id {} yields {:?}, expected {:?}",
                        candidate, recovered, self.account
                    );
                }
                Err(e) => {
                    debug!("Recovery id {} not recoverable: {}", candidate, e);
                }
            }
        }

        Err(WalletError::RecoveryFailed {
            expected: self.account,
        })
    }
}
