//! Remote signing authority
//!
//! The private key never leaves the signer. The wallet hands it a 32-byte
//! digest and gets back `(r, s)`; the account address is learned once per
//! session from the same service unless configuration pins it.

pub mod http;

pub use http::HttpSigner;

use crate::error::WalletResult;
use crate::tx::{Digest, RawSignature};

use async_trait::async_trait;
use ethers::types::Address;

/// Signs digests with a key the wallet never sees
#[async_trait]
pub trait RemoteSigner: Send + Sync {
    /// Sign a digest, returning `(r, s)` without a recovery id
    async fn sign_digest(&self, digest: &Digest) -> WalletResult<RawSignature>;
}

/// Supplies the account address controlled by the signer
#[async_trait]
pub trait AddressProvider: Send + Sync {
    async fn address(&self) -> WalletResult<Address>;
}
