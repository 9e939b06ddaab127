//! EIP-1559 fee derivation from the latest base fee

use crate::config::FeeConfig;

use ethers::types::U256;
use tracing::{debug, warn};

/// One gwei, the flat tip offered on every transfer
pub const DEFAULT_PRIORITY_FEE_WEI: u64 = 1_000_000_000;

/// Headroom against one block's worth of base fee increase
pub const DEFAULT_BASE_FEE_MULTIPLIER: u64 = 2;

/// Fee fields of a type-2 transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    pub max_priority_fee_per_gas: U256,
    pub max_fee_per_gas: U256,
}

/// Fixed-multiplier fee estimator
pub struct FeeEstimator {
    priority_fee: U256,
    base_fee_multiplier: U256,
}

impl FeeEstimator {
    /// Create a fee estimator with the standard tip and multiplier
    pub fn new() -> Self {
        Self {
            priority_fee: U256::from(DEFAULT_PRIORITY_FEE_WEI),
            base_fee_multiplier: U256::from(DEFAULT_BASE_FEE_MULTIPLIER),
        }
    }

    pub fn from_config(config: &FeeConfig) -> Self {
        Self {
            priority_fee: config.priority_fee(),
            base_fee_multiplier: U256::from(config.base_fee_multiplier),
        }
    }

    /// max fee = multiplier * base fee + tip
    ///
    /// A block without a base fee prices the transfer at the tip alone.
    pub fn estimate(&self, base_fee: Option<U256>) -> FeeEstimate {
        let base_fee = match base_fee {
            Some(fee) => fee,
            None => {
                warn!("Latest block has no base fee, pricing with priority fee only");
                crate::metrics::record_missing_base_fee();
                U256::zero()
            }
        };

        let max_fee_per_gas = base_fee
            .saturating_mul(self.base_fee_multiplier)
            .saturating_add(self.priority_fee);

        let estimate = FeeEstimate {
            max_priority_fee_per_gas: self.priority_fee,
            max_fee_per_gas,
        };
        debug!("Fee estimate for base fee {}: {:?}", base_fee, estimate);
        estimate
    }
}

impl Default for FeeEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const GWEI: u64 = 1_000_000_000;

    #[test]
    fn test_ten_gwei_base_fee() {
        let estimate = FeeEstimator::new().estimate(Some(U256::from(10 * GWEI)));
        assert_eq!(estimate.max_priority_fee_per_gas, U256::from(GWEI));
        assert_eq!(estimate.max_fee_per_gas, U256::from(21 * GWEI));
    }

    #[test]
    fn test_missing_base_fee_degrades_to_tip() {
        let estimate = FeeEstimator::new().estimate(None);
        assert_eq!(estimate.max_fee_per_gas, U256::from(GWEI));
        assert_eq!(estimate.max_fee_per_gas, estimate.max_priority_fee_per_gas);
    }

    #[test]
    fn test_configured_tip_and_multiplier() {
        let estimator = FeeEstimator::from_config(&FeeConfig {
            priority_fee_wei: 2 * GWEI,
            base_fee_multiplier: 3,
        });
        let estimate = estimator.estimate(Some(U256::from(GWEI)));
        assert_eq!(estimate.max_fee_per_gas, U256::from(5 * GWEI));
    }

    #[test]
    fn test_huge_base_fee_saturates() {
        let estimate = FeeEstimator::new().estimate(Some(U256::MAX));
        assert_eq!(estimate.max_fee_per_gas, U256::MAX);
    }

    proptest! {
        #[test]
        fn prop_max_fee_is_double_base_plus_tip(base in any::<u128>()) {
            let base = U256::from(base);
            let estimate = FeeEstimator::new().estimate(Some(base));
            prop_assert_eq!(
                estimate.max_fee_per_gas,
                base * 2 + estimate.max_priority_fee_per_gas
            );
            prop_assert!(estimate.max_fee_per_gas >= estimate.max_priority_fee_per_gas);
        }
    }
}
