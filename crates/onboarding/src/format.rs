//! Display helpers for addresses, hashes and token amounts.

use alloy_primitives::{Address, U256};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("invalid amount `{0}`")]
    Invalid(String),

    #[error("amount `{0}` does not fit in 256 bits")]
    Overflow(String),
}

/// Shorten a hex string to `0x1234...abcd`.
pub fn shorten(value: &str) -> String {
    if value.len() <= 10 {
        return value.to_string();
    }
    format!("{}...{}", &value[..6], &value[value.len() - 4..])
}

/// Shortened checksummed address.
pub fn format_address(address: Address) -> String {
    shorten(&address.to_string())
}

/// Format a raw token amount with `decimals` decimals.
///
/// Trailing zeros of the fraction are dropped and whole amounts carry no
/// fractional part: `1500000000000000000` with 18 decimals is `1.5`.
pub fn format_token_amount(value: U256, decimals: u8) -> String {
    let (quotient, remainder) = match U256::from(10u8).checked_pow(U256::from(decimals)) {
        Some(divisor) => value.div_rem(divisor),
        None => (U256::ZERO, value),
    };

    if remainder.is_zero() {
        return quotient.to_string();
    }

    let fraction = format!("{:0>width$}", remainder.to_string(), width = decimals as usize);
    format!("{}.{}", quotient, fraction.trim_end_matches('0'))
}

/// Like [`format_token_amount`], but shows an infinite approval as `unlimited`.
pub fn format_allowance(value: U256, decimals: u8) -> String {
    if value == U256::MAX {
        "unlimited".to_string()
    } else {
        format_token_amount(value, decimals)
    }
}

/// Parse a decimal token amount into raw units.
///
/// Digits beyond `decimals` are truncated, a missing integer part reads as
/// zero (`.5`).
pub fn parse_token_amount(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return Err(AmountError::Invalid(amount.to_string()));
    }

    let mut digits = String::with_capacity(whole.len() + decimals as usize);
    digits.push_str(whole);
    digits.extend(
        fraction
            .chars()
            .chain(std::iter::repeat('0'))
            .take(decimals as usize),
    );

    if digits.is_empty() {
        return Ok(U256::ZERO);
    }

    U256::from_str_radix(&digits, 10).map_err(|_| AmountError::Overflow(amount.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};

    #[test]
    fn test_format_address() {
        let addr = address!("e2ba9bcac21eb68f86938d166802283ac57c7530");
        let short = format_address(addr);
        assert!(short.starts_with("0x"));
        assert_eq!(short.len(), 6 + 3 + 4);
        assert!(short.to_lowercase().ends_with("7530"));
    }

    #[test]
    fn test_shorten_hash_and_short_values() {
        let hash = b256!("1111111111111111111111111111111111111111111111111111111111112222");
        assert_eq!(shorten(&hash.to_string()), "0x1111...2222");
        assert_eq!(shorten(""), "");
        assert_eq!(shorten("0x1234"), "0x1234");
    }

    #[test]
    fn test_format_token_amount() {
        let one = U256::from(10u64).pow(U256::from(18));
        assert_eq!(format_token_amount(U256::ZERO, 18), "0");
        assert_eq!(format_token_amount(one, 18), "1");
        assert_eq!(format_token_amount(one * U256::from(3) / U256::from(2), 18), "1.5");
        assert_eq!(format_token_amount(U256::from(1), 18), "0.000000000000000001");
        assert_eq!(format_token_amount(U256::from(1234), 0), "1234");
        assert_eq!(format_token_amount(U256::from(120), 2), "1.2");
    }

    #[test]
    fn test_format_allowance() {
        assert_eq!(format_allowance(U256::MAX, 18), "unlimited");
        assert_eq!(format_allowance(U256::from(5), 1), "0.5");
    }

    #[test]
    fn test_parse_token_amount() {
        assert_eq!(
            parse_token_amount("100", 18).unwrap(),
            U256::from(100u64) * U256::from(10u64).pow(U256::from(18))
        );
        assert_eq!(parse_token_amount("1.5", 2).unwrap(), U256::from(150));
        assert_eq!(parse_token_amount(".5", 1).unwrap(), U256::from(5));
        assert_eq!(parse_token_amount("2.", 1).unwrap(), U256::from(20));
        assert_eq!(parse_token_amount("0", 18).unwrap(), U256::ZERO);
        // extra precision is truncated
        assert_eq!(parse_token_amount("1.239", 2).unwrap(), U256::from(123));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_token_amount("  ", 18), Err(AmountError::Empty));
        assert!(matches!(parse_token_amount("-1", 18), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_token_amount("1.2.3", 18), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_token_amount(".", 18), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_token_amount("1e18", 18), Err(AmountError::Invalid(_))));

        let huge = "9".repeat(80);
        assert!(matches!(parse_token_amount(&huge, 0), Err(AmountError::Overflow(_))));
    }

    #[test]
    fn test_format_parse_agree() {
        let raw = parse_token_amount("1234.5678", 18).unwrap();
        assert_eq!(format_token_amount(raw, 18), "1234.5678");
    }
}
