//! Transfer pipeline: account state, fees, build, sign, recover, broadcast

use super::assembler::TransactionAssembler;
use super::builder::TransactionBuilder;
use super::encoding;
use super::fees::FeeEstimator;
use super::guard::SingleFlight;
use super::recovery::RecoveryResolver;
use crate::chain::{AccountStateFetcher, NetworkClient};
use crate::error::{Stage, WalletError, WalletResult};
use crate::signer::RemoteSigner;

use chrono::{DateTime, Utc};
use ethers::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// A value transfer as requested by the caller
#[derive(Debug, Clone, Deserialize)]
pub struct TransferRequest {
    /// 20-byte hex address
    pub recipient: String,
    /// Decimal ether
    pub amount: String,
}

/// Outcome of a broadcast transfer
#[derive(Debug, Clone, Serialize)]
pub struct TransferReceipt {
    pub tx_hash: H256,
    pub nonce: u64,
    pub submitted_at: DateTime<Utc>,
}

/// Caller side of an abandonment signal
pub struct AbandonHandle {
    tx: watch::Sender<bool>,
}

impl AbandonHandle {
    /// Abandon the attempt; any signer response still in flight is discarded
    pub fn abandon(&self) {
        // no receiver means the attempt already finished
        let _ = self.tx.send(true);
    }
}

/// Attempt side of an abandonment signal
#[derive(Clone)]
pub struct AbandonSignal {
    rx: watch::Receiver<bool>,
}

impl AbandonSignal {
    pub fn new() -> (AbandonHandle, AbandonSignal) {
        let (tx, rx) = watch::channel(false);
        (AbandonHandle { tx }, AbandonSignal { rx })
    }

    /// A signal that never fires
    pub fn never() -> AbandonSignal {
        let (_handle, signal) = Self::new();
        signal
    }

    pub fn is_abandoned(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the attempt is abandoned. Pends forever if the handle
    /// is dropped without abandoning.
    pub async fn abandoned(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    fn check(&self, stage: Stage) -> WalletResult<()> {
        if self.is_abandoned() {
            Err(WalletError::Abandoned { stage })
        } else {
            Ok(())
        }
    }
}

/// Orchestrates one send attempt at a time per account
pub struct TransferPipeline {
    /// Account the signer controls
    account: Address,
    /// Network node
    network: Arc<dyn NetworkClient>,
    /// Enclave signer
    signer: Arc<dyn RemoteSigner>,
    fees: FeeEstimator,
    builder: TransactionBuilder,
    resolver: RecoveryResolver,
    in_flight: SingleFlight,
}

impl TransferPipeline {
    pub fn new(
        account: Address,
        network: Arc<dyn NetworkClient>,
        signer: Arc<dyn RemoteSigner>,
        fees: FeeEstimator,
    ) -> Self {
        let builder = TransactionBuilder::new(network.chain_id());

        info!(
            "Transfer pipeline initialized for {:?} on chain {}",
            account,
            builder.chain_id()
        );

        Self {
            account,
            network,
            signer,
            fees,
            builder,
            resolver: RecoveryResolver::new(account),
            in_flight: SingleFlight::new(),
        }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn chain_id(&self) -> u64 {
        self.builder.chain_id()
    }

    /// Balance of the account in wei
    pub async fn balance(&self) -> WalletResult<U256> {
        self.network.get_balance(self.account).await
    }

    /// Check the node answers
    pub async fn health_check(&self) -> WalletResult<u64> {
        self.network.block_number().await
    }

    /// Send a transfer that can only be abandoned by dropping the future
    pub async fn send(&self, request: TransferRequest) -> WalletResult<TransferReceipt> {
        self.send_until_abandoned(request, AbandonSignal::never())
            .await
    }

    /// Send a transfer, giving up if `signal` fires before broadcast
    pub async fn send_until_abandoned(
        &self,
        request: TransferRequest,
        signal: AbandonSignal,
    ) -> WalletResult<TransferReceipt> {
        let attempt_id = Uuid::new_v4();
        let span = info_span!(
            "transfer",
            %attempt_id,
            account = ?self.account,
            chain_id = self.chain_id()
        );

        let result = self
            .run_attempt(attempt_id, request, signal)
            .instrument(span)
            .await;

        match &result {
            Ok(receipt) => {
                crate::metrics::record_tx_submitted(self.chain_id());
                info!(
                    "Transfer {} broadcast as {:?} with nonce {}",
                    attempt_id, receipt.tx_hash, receipt.nonce
                );
            }
            Err(e) => {
                crate::metrics::record_transfer_failure(e.stage());
                match e {
                    WalletError::Abandoned { .. } | WalletError::MalformedInput { .. } => {
                        info!("Transfer {} ended: {}", attempt_id, e)
                    }
                    _ if e.is_retryable() => {
                        warn!("Transfer {} failed at {}, retryable: {}", attempt_id, e.stage(), e)
                    }
                    _ => error!("Transfer {} failed at {}: {}", attempt_id, e.stage(), e),
                }
            }
        }

        result
    }

    async fn run_attempt(
        &self,
        attempt_id: Uuid,
        request: TransferRequest,
        mut signal: AbandonSignal,
    ) -> WalletResult<TransferReceipt> {
        let _permit = self.in_flight.try_acquire(self.account, attempt_id)?;

        let snapshot = AccountStateFetcher::new(self.network.as_ref())
            .fetch(self.account)
            .await?;

        let fees = self.fees.estimate(snapshot.base_fee);
        let unsigned =
            self.builder
                .build(snapshot.nonce, &fees, &request.recipient, &request.amount)?;
        let digest = encoding::signing_digest(&unsigned);
        debug!(
            "Built transfer with nonce {}, max cost {} wei, digest {}",
            unsigned.nonce,
            unsigned.max_total_cost(),
            digest
        );

        signal.check(Stage::Signing)?;

        let started = Instant::now();
        let raw = tokio::select! {
            biased;
            _ = signal.abandoned() => {
                warn!("Abandoned while waiting for signer");
                return Err(WalletError::Abandoned { stage: Stage::Signing });
            }
            signed = self.signer.sign_digest(&digest) => signed?,
        };
        crate::metrics::record_signer_latency(started.elapsed().as_secs_f64());

        // a response that lost the race to abandonment is dropped here
        signal.check(Stage::Recovery)?;
        let resolved = self.resolver.resolve(&digest, &raw)?;

        let signed = TransactionAssembler::assemble(unsigned, resolved);

        signal.check(Stage::Broadcast)?;
        let tx_hash = self.network.send_raw_transaction(signed.encoded()).await?;

        if tx_hash != signed.hash() {
            warn!(
                "Node reported hash {:?}, local encoding hashes to {:?}",
                tx_hash,
                signed.hash()
            );
        }

        Ok(TransferReceipt {
            tx_hash,
            nonce: signed.transaction.nonce,
            submitted_at: Utc::now(),
        })
    }
}
