//! Deterministic keys and collaborator fakes shared by the unit tests

use super::recovery::RecoveryId;
use super::types::{Digest, RawSignature};
use crate::chain::NetworkClient;
use crate::error::{WalletError, WalletResult};
use crate::signer::{AddressProvider, RemoteSigner};

use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, H256, U256};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub(crate) fn wallet() -> LocalWallet {
    "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318"
        .parse()
        .unwrap()
}

pub(crate) fn other_wallet() -> LocalWallet {
    "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d"
        .parse()
        .unwrap()
}

/// Sign like the enclave does, keeping the parity the enclave would drop
pub(crate) fn sign(wallet: &LocalWallet, digest: &Digest) -> (RawSignature, RecoveryId) {
    let signature = wallet.sign_hash(digest.as_h256()).unwrap();
    let parity = RecoveryId::from_y_parity((signature.v - 27) as u8).unwrap();
    (RawSignature::new(signature.r, signature.s), parity)
}

/// Enclave stand-in backed by a local key
pub(crate) struct WalletSigner {
    pub wallet: LocalWallet,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl WalletSigner {
    pub fn new(wallet: LocalWallet) -> Self {
        Self {
            wallet,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSigner for WalletSigner {
    async fn sign_digest(&self, digest: &Digest) -> WalletResult<RawSignature> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(sign(&self.wallet, digest).0)
    }
}

#[async_trait]
impl AddressProvider for WalletSigner {
    async fn address(&self) -> WalletResult<Address> {
        Ok(self.wallet.address())
    }
}

/// Signer that always refuses
pub(crate) struct RefusingSigner;

#[async_trait]
impl RemoteSigner for RefusingSigner {
    async fn sign_digest(&self, _digest: &Digest) -> WalletResult<RawSignature> {
        Err(WalletError::SignerRejected("enclave sealed".to_string()))
    }
}

/// In-memory node that records what is broadcast
pub(crate) struct FakeNetwork {
    pub chain_id: u64,
    pub nonce: u64,
    pub base_fee: Option<U256>,
    pub balance: U256,
    pub broadcasts: Mutex<Vec<Bytes>>,
}

impl FakeNetwork {
    pub fn new(nonce: u64, base_fee: Option<U256>) -> Self {
        Self {
            chain_id: 11_155_111,
            nonce,
            base_fee,
            balance: U256::exp10(18),
            broadcasts: Mutex::new(Vec::new()),
        }
    }

    pub fn broadcasts(&self) -> Vec<Bytes> {
        self.broadcasts.lock().unwrap().clone()
    }
}

#[async_trait]
impl NetworkClient for FakeNetwork {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn block_number(&self) -> WalletResult<u64> {
        Ok(1)
    }

    async fn get_balance(&self, _address: Address) -> WalletResult<U256> {
        Ok(self.balance)
    }

    async fn get_transaction_count(&self, _address: Address) -> WalletResult<u64> {
        Ok(self.nonce)
    }

    async fn get_latest_base_fee(&self) -> WalletResult<Option<U256>> {
        Ok(self.base_fee)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> WalletResult<H256> {
        let hash = H256::from(ethers::utils::keccak256(&raw));
        self.broadcasts.lock().unwrap().push(raw);
        Ok(hash)
    }
}
