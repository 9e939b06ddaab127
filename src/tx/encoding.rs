//! Canonical EIP-2718 type-2 encoding and the signing digest
//!
//! Layout: `0x02 || rlp([chain_id, nonce, max_priority_fee_per_gas,
//! max_fee_per_gas, gas_limit, to, value, data, access_list])`, with
//! `y_parity, r, s` appended to the list in signed mode.

use super::recovery::RecoveryId;
use super::types::{Digest, RawSignature, UnsignedTransaction};

use ethers::types::Bytes;
use ethers::utils::rlp::RlpStream;
use sha3::{Digest as _, Keccak256};

/// EIP-2718 type byte of fee-market transactions
pub const EIP1559_TX_TYPE: u8 = 0x02;

const UNSIGNED_FIELDS: usize = 9;
const SIGNED_FIELDS: usize = 12;

/// Which form of the transaction to encode
#[derive(Debug, Clone, Copy)]
pub enum EncodingMode<'a> {
    Unsigned,
    Signed {
        signature: &'a RawSignature,
        recovery_id: RecoveryId,
    },
}

/// Encode a transaction in the canonical form a node verifies against
pub fn encode(tx: &UnsignedTransaction, mode: EncodingMode<'_>) -> Bytes {
    let fields = match mode {
        EncodingMode::Unsigned => UNSIGNED_FIELDS,
        EncodingMode::Signed { .. } => SIGNED_FIELDS,
    };

    let mut stream = RlpStream::new_list(fields);
    stream.append(&tx.chain_id);
    stream.append(&tx.nonce);
    stream.append(&tx.max_priority_fee_per_gas);
    stream.append(&tx.max_fee_per_gas);
    stream.append(&tx.gas_limit);
    stream.append(&tx.to);
    stream.append(&tx.value);
    stream.append(&tx.data.as_ref());
    // access list
    stream.begin_list(0);

    if let EncodingMode::Signed {
        signature,
        recovery_id,
    } = mode
    {
        stream.append(&recovery_id.y_parity());
        stream.append(&signature.r);
        stream.append(&signature.s);
    }

    let body = stream.out();
    let mut encoded = Vec::with_capacity(1 + body.len());
    encoded.push(EIP1559_TX_TYPE);
    encoded.extend_from_slice(&body);
    encoded.into()
}

/// Keccak-256 of an encoding
pub fn digest(encoding: &[u8]) -> Digest {
    let hash = Keccak256::digest(encoding);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    Digest::from_bytes(out)
}

/// Digest of the unsigned encoding, the value handed to the signer
pub fn signing_digest(tx: &UnsignedTransaction) -> Digest {
    digest(&encode(tx, EncodingMode::Unsigned))
}
