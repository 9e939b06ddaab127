//! Transaction records shared by the send pipeline

use ethers::types::{Address, Bytes, H256, U256};
use std::fmt;

/// Order of the secp256k1 group
pub const SECP256K1_ORDER: U256 = U256([
    0xBFD2_5E8C_D036_4141,
    0xBAAE_DCE6_AF48_A03B,
    0xFFFF_FFFF_FFFF_FFFE,
    0xFFFF_FFFF_FFFF_FFFF,
]);

/// Gas used by a plain value transfer
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// Unsigned EIP-1559 value transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_fee_per_gas: U256,
    pub max_fee_per_gas: U256,
    pub gas_limit: u64,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

impl UnsignedTransaction {
    /// Most the sender can be charged: value plus gas at the max fee
    pub fn max_total_cost(&self) -> U256 {
        U256::from(self.gas_limit)
            .saturating_mul(self.max_fee_per_gas)
            .saturating_add(self.value)
    }
}

/// Keccak-256 of an unsigned canonical encoding; the value the signer signs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest(H256);

impl Digest {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(H256(bytes))
    }

    pub fn as_h256(&self) -> H256 {
        self.0
    }

    /// Lowercase hex without a `0x` prefix
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

/// `(r, s)` as returned by the remote signer, without a recovery id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSignature {
    pub r: U256,
    pub s: U256,
}

impl RawSignature {
    pub fn new(r: U256, s: U256) -> Self {
        Self { r, s }
    }

    /// Parse hex components, each optionally `0x`-prefixed.
    ///
    /// Only the shape is checked: both values non-zero and below the group
    /// order. Whether they form a valid signature is for recovery to decide.
    pub fn from_hex_components(r: &str, s: &str) -> Result<Self, String> {
        Ok(Self {
            r: parse_component("r", r)?,
            s: parse_component("s", s)?,
        })
    }

    /// `s` in the upper half of the group order
    pub fn is_high_s(&self) -> bool {
        self.s > SECP256K1_ORDER >> 1
    }

    /// Low-`s` form of the same signature. Flips the y-parity of `R`.
    pub fn normalized(&self) -> Self {
        if self.is_high_s() {
            Self::new(self.r, SECP256K1_ORDER - self.s)
        } else {
            *self
        }
    }
}

fn parse_component(name: &str, raw: &str) -> Result<U256, String> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() {
        return Err(format!("signature component {} is empty", name));
    }
    if digits.len() > 64 {
        return Err(format!(
            "signature component {} has {} hex digits, expected at most 64",
            name,
            digits.len()
        ));
    }

    let value = U256::from_str_radix(digits, 16)
        .map_err(|e| format!("signature component {} is not hex: {:?}", name, e))?;

    if value.is_zero() || value >= SECP256K1_ORDER {
        return Err(format!(
            "signature component {} is outside the curve order",
            name
        ));
    }

    Ok(value)
}
