//! Builds unsigned transfers from user input and observed account state

use super::fees::FeeEstimate;
use super::types::{UnsignedTransaction, TRANSFER_GAS_LIMIT};
use crate::error::{WalletError, WalletResult};

use ethers::types::{Address, Bytes, U256};
use ethers::utils::parse_ether;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Up to 18 decimals, and few enough integer digits that the wei value fits in 256 bits.
    static ref AMOUNT_PATTERN: Regex =
        Regex::new(r"^(?:[0-9]{1,58}(?:\.[0-9]{0,18})?|\.[0-9]{1,18})$").expect("static pattern");
}

/// Assembles unsigned value transfers for one chain
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    chain_id: u64,
}

impl TransactionBuilder {
    pub fn new(chain_id: u64) -> Self {
        Self { chain_id }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Build a transfer of `amount` ether to `recipient`
    pub fn build(
        &self,
        nonce: u64,
        fees: &FeeEstimate,
        recipient: &str,
        amount: &str,
    ) -> WalletResult<UnsignedTransaction> {
        let to = parse_recipient(recipient)?;
        let value = parse_amount(amount)?;

        Ok(UnsignedTransaction {
            chain_id: self.chain_id,
            nonce,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
            max_fee_per_gas: fees.max_fee_per_gas,
            gas_limit: TRANSFER_GAS_LIMIT,
            to,
            value,
            data: Bytes::default(),
        })
    }
}

/// Parse a 20-byte hex address, `0x` optional, any letter case
pub fn parse_recipient(recipient: &str) -> WalletResult<Address> {
    let trimmed = recipient.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.len() != 40 {
        return Err(WalletError::MalformedInput {
            field: "recipient",
            message: format!("expected 40 hex digits, got {}", digits.len()),
        });
    }

    digits
        .parse::<Address>()
        .map_err(|e| WalletError::MalformedInput {
            field: "recipient",
            message: e.to_string(),
        })
}

/// Parse a non-negative decimal ether amount into wei
pub fn parse_amount(amount: &str) -> WalletResult<U256> {
    let trimmed = amount.trim();

    if !AMOUNT_PATTERN.is_match(trimmed) {
        return Err(WalletError::MalformedInput {
            field: "amount",
            message: format!("{:?} is not a non-negative decimal ether amount", amount),
        });
    }

    parse_ether(trimmed).map_err(|e| WalletError::MalformedInput {
        field: "amount",
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GWEI: u64 = 1_000_000_000;

    fn fees() -> FeeEstimate {
        FeeEstimate {
            max_priority_fee_per_gas: U256::from(GWEI),
            max_fee_per_gas: U256::from(21 * GWEI),
        }
    }

    #[test]
    fn test_build_plain_transfer() {
        let builder = TransactionBuilder::new(11_155_111);
        let tx = builder
            .build(5, &fees(), &format!("0x{}", "aa".repeat(20)), "1")
            .unwrap();

        assert_eq!(tx.chain_id, 11_155_111);
        assert_eq!(tx.nonce, 5);
        assert_eq!(tx.max_priority_fee_per_gas, U256::from(GWEI));
        assert_eq!(tx.max_fee_per_gas, U256::from(21 * GWEI));
        assert_eq!(tx.gas_limit, 21_000);
        assert_eq!(tx.to, Address::repeat_byte(0xaa));
        assert_eq!(tx.value, U256::exp10(18));
        assert!(tx.data.is_empty());
    }

    #[test]
    fn test_recipient_forms() {
        let expected = Address::repeat_byte(0xab);
        assert_eq!(parse_recipient(&"ab".repeat(20)).unwrap(), expected);
        assert_eq!(parse_recipient(&format!("0x{}", "AB".repeat(20))).unwrap(), expected);
        assert_eq!(parse_recipient(&format!("  0x{}\n", "ab".repeat(20))).unwrap(), expected);
    }

    #[test]
    fn test_rejects_bad_recipient() {
        for bad in [
            "",
            "0x",
            "0x1234",
            format!("0x{}", "zz".repeat(20)).as_str(),
            "ab".repeat(21).as_str(),
        ] {
            let err = parse_recipient(bad).unwrap_err();
            assert!(
                matches!(err, WalletError::MalformedInput { field: "recipient", .. }),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_amounts() {
        assert_eq!(parse_amount("0").unwrap(), U256::zero());
        assert_eq!(parse_amount("1.5").unwrap(), U256::from(1_500_000_000_000_000_000u64));
        assert_eq!(parse_amount(".25").unwrap(), U256::from(250_000_000_000_000_000u64));
        assert_eq!(parse_amount("2.").unwrap(), U256::from(2_000_000_000_000_000_000u64));
        assert_eq!(parse_amount("0.000000000000000001").unwrap(), U256::one());
    }

    #[test]
    fn test_rejects_bad_amount() {
        for bad in ["", ".", "-1", "1e18", "abc", "1.2.3", "0.0000000000000000001", "1,5"] {
            let err = parse_amount(bad).unwrap_err();
            assert!(
                matches!(err, WalletError::MalformedInput { field: "amount", .. }),
                "accepted {bad:?}"
            );
        }
        assert!(parse_amount(&"9".repeat(59)).is_err());
    }

    #[test]
    fn test_bad_input_reports_field() {
        let builder = TransactionBuilder::new(1);
        let err = builder
            .build(0, &fees(), &format!("0x{}", "aa".repeat(20)), "one")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Malformed amount: \"one\" is not a non-negative decimal ether amount"
        );
    }
}
