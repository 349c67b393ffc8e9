//! Utility functions for payment operations.
//!
//! Decimal amount parsing/formatting in a token's precision, recipient address
//! normalization and small display helpers.

use crate::errors::{PaymentError, Result};
use ethers::types::{Address, U256};
use ethers::utils::{format_units, to_checksum};
use std::str::FromStr;

/// Parses a positive decimal amount (e.g. `"1.5"`) into base units of the given precision.
///
/// Signs, exponents, empty strings, zero, and more fractional digits than the asset
/// supports are all rejected.
///
/// # Examples
///
/// ```
/// use evm_pay::utils::parse_amount;
/// use ethers::types::U256;
///
/// assert_eq!(parse_amount("1.5", 6).unwrap(), U256::from(1_500_000u64));
/// assert!(parse_amount("0", 18).is_err());
/// assert!(parse_amount("-1", 18).is_err());
/// ```
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256> {
    let trimmed = amount.trim();
    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };

    let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !digits_only(whole) || !digits_only(fraction) {
        return Err(PaymentError::InvalidAmount(format!(
            "'{}' is not a decimal number",
            amount
        )));
    }
    if fraction.len() > decimals as usize {
        return Err(PaymentError::InvalidAmount(format!(
            "'{}' has more than {} decimal places",
            amount, decimals
        )));
    }

    let too_large = || PaymentError::InvalidAmount(format!("'{}' is too large", amount));
    // 10^78 no longer fits in 256 bits.
    if decimals > 77 {
        return Err(too_large());
    }
    let whole = whole.trim_start_matches('0');
    let whole = if whole.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(whole).map_err(|_| too_large())?
    };
    let fraction = if fraction.is_empty() {
        U256::zero()
    } else {
        let padded = format!("{:0<width$}", fraction, width = decimals as usize);
        U256::from_dec_str(&padded).map_err(|_| too_large())?
    };
    let value = whole
        .checked_mul(U256::exp10(decimals as usize))
        .and_then(|scaled| scaled.checked_add(fraction))
        .ok_or_else(too_large)?;

    if value.is_zero() {
        return Err(PaymentError::InvalidAmount(format!(
            "'{}' must be greater than zero",
            amount
        )));
    }
    Ok(value)
}

/// Formats base units as a decimal string without trailing zeros.
///
/// # Examples
///
/// ```
/// use evm_pay::utils::format_amount;
/// use ethers::types::U256;
///
/// assert_eq!(format_amount(U256::from(50_000_000u64), 6), "50");
/// assert_eq!(format_amount(U256::from(1_500_000u64), 6), "1.5");
/// ```
pub fn format_amount(value: U256, decimals: u8) -> String {
    let formatted = match format_units(value, decimals as u32) {
        Ok(formatted) => formatted,
        Err(_) => return value.to_string(),
    };
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}

/// A recipient address after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedAddress {
    /// Parsed address
    pub address: Address,

    /// Canonical string form: EIP-55 checksummed, or lowercase when the input carried a bad checksum
    pub formatted: String,

    /// Whether `formatted` is the checksummed form
    pub checksummed: bool,
}

/// Normalizes an externally supplied recipient address.
///
/// Well-formed input is returned in EIP-55 checksum form. Mixed-case input whose
/// casing does not match the checksum is still accepted, in lowercase form, rather
/// than rejected. Input that is not 20 hex bytes is an error.
///
/// # Examples
///
/// ```
/// use evm_pay::utils::normalize_address;
///
/// let n = normalize_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
/// assert!(n.checksummed);
/// assert_eq!(n.formatted, "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
/// ```
pub fn normalize_address(raw: &str) -> Result<NormalizedAddress> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(PaymentError::InvalidAddress(format!(
            "{}: expected 20 hex-encoded bytes",
            raw
        )));
    }
    let address = Address::from_str(body)
        .map_err(|e| PaymentError::InvalidAddress(format!("{}: {}", raw, e)))?;

    let checksum = to_checksum(&address, None);
    let mixed_case = body.chars().any(|c| c.is_ascii_lowercase())
        && body.chars().any(|c| c.is_ascii_uppercase());

    if mixed_case && checksum[2..] != *body {
        tracing::warn!(recipient = %raw, "address checksum mismatch, using lowercase form");
        return Ok(NormalizedAddress {
            address,
            formatted: lowercase_address(&address),
            checksummed: false,
        });
    }

    Ok(NormalizedAddress {
        address,
        formatted: checksum,
        checksummed: true,
    })
}

/// Lowercase `0x`-prefixed form of an address.
pub fn lowercase_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_bytes()))
}

/// Shortens an address for display: `0x742d...bEbb`.
pub fn short_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

/// Hex quantity form of a chain id as wallets expect it (`137` -> `"0x89"`).
pub fn chain_id_hex(chain_id: u64) -> String {
    format!("0x{:x}", chain_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(
            parse_amount("1.5", 18).unwrap(),
            U256::from(1_500_000_000_000_000_000u128)
        );
        assert_eq!(parse_amount("100", 6).unwrap(), U256::from(100_000_000u64));
        assert_eq!(parse_amount(".5", 6).unwrap(), U256::from(500_000u64));
        assert_eq!(parse_amount("0.000001", 6).unwrap(), U256::one());
    }

    #[test]
    fn test_parse_amount_rejects() {
        for bad in ["", ".", "0", "0.000", "-1", "+1", "1e18", "abc", "1.2.3", "1,5"] {
            let err = parse_amount(bad, 18).unwrap_err();
            assert!(matches!(err, PaymentError::InvalidAmount(_)), "{bad}");
        }
        assert!(parse_amount("0.0000001", 6).is_err());
    }

    #[test]
    fn test_parse_amount_rejects_overflow() {
        let huge = format!("1{}", "0".repeat(69));
        let err = parse_amount(&huge, 18).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidAmount(_)));

        // More digits than a 256-bit integer can hold at all.
        let err = parse_amount(&"9".repeat(80), 0).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidAmount(_)));

        // U256::MAX is still accepted at zero decimals.
        assert_eq!(parse_amount(&U256::MAX.to_string(), 0).unwrap(), U256::MAX);
        assert_eq!(
            parse_amount("0001.50", 6).unwrap(),
            U256::from(1_500_000u64)
        );
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(U256::zero(), 18), "0");
        assert_eq!(
            format_amount(U256::from(2_000_000_000_000_000_000u128), 18),
            "2"
        );
        assert_eq!(format_amount(U256::from(10_000_000_000_000_000u128), 18), "0.01");
        assert_eq!(format_amount(U256::from(123u64), 0), "123");
    }

    #[test]
    fn test_normalize_checksummed() {
        let n = normalize_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
        assert!(n.checksummed);
        assert_eq!(n.formatted, "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");

        let n = normalize_address("5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED").unwrap();
        assert!(n.checksummed);
        assert_eq!(n.formatted, "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
    }

    #[test]
    fn test_normalize_bad_checksum_falls_back_to_lowercase() {
        // Same address, one letter's case flipped.
        let n = normalize_address("0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
        assert!(!n.checksummed);
        assert_eq!(n.formatted, "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");
        assert_eq!(
            n.address,
            "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".parse::<Address>().unwrap()
        );
    }

    #[test]
    fn test_normalize_rejects_malformed() {
        assert!(normalize_address("invalid").is_err());
        assert!(normalize_address("0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb").is_err());
        assert!(normalize_address("0xZZ2d35Cc6634C0532925a3b844Bc9e7595f0bEbb").is_err());
    }

    #[test]
    fn test_short_address() {
        assert_eq!(
            short_address("0x742d35Cc6634C0532925a3b844Bc9e7595f0bEbb"),
            "0x742d...bEbb"
        );
        assert_eq!(short_address("0x12"), "0x12");
    }

    #[test]
    fn test_chain_id_hex() {
        assert_eq!(chain_id_hex(137), "0x89");
        assert_eq!(chain_id_hex(80002), "0x13882");
    }
}
