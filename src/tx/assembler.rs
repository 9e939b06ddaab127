//! Merges an unsigned transfer with its resolved signature

use super::encoding::{self, EncodingMode};
use super::recovery::{RecoveryId, ResolvedSignature};
use super::types::{RawSignature, UnsignedTransaction};

use ethers::types::{Bytes, H256};

/// Broadcast-ready transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub transaction: UnsignedTransaction,
    pub signature: RawSignature,
    pub recovery_id: RecoveryId,
}

impl SignedTransaction {
    /// Canonical signed encoding, as submitted to the node
    pub fn encoded(&self) -> Bytes {
        encoding::encode(
            &self.transaction,
            EncodingMode::Signed {
                signature: &self.signature,
                recovery_id: self.recovery_id,
            },
        )
    }

    /// Transaction hash the node will report for this encoding
    pub fn hash(&self) -> H256 {
        encoding::digest(&self.encoded()).as_h256()
    }
}

/// Pure merge; the signature was already checked by the resolver
pub struct TransactionAssembler;

impl TransactionAssembler {
    pub fn assemble(
        transaction: UnsignedTransaction,
        resolved: ResolvedSignature,
    ) -> SignedTransaction {
        SignedTransaction {
            transaction,
            signature: resolved.signature,
            recovery_id: resolved.recovery_id,
        }
    }
}
