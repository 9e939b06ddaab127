//! Transfer construction, remote signing orchestration and signature recovery

pub mod assembler;
pub mod builder;
pub mod encoding;
pub mod fees;
pub mod guard;
pub mod recovery;
pub mod sender;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use fees::FeeEstimator;
pub use recovery::RecoveryId;
pub use sender::{AbandonSignal, TransferPipeline, TransferReceipt, TransferRequest};
pub use types::{Digest, RawSignature};
