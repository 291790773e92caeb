//! Decimal amounts
//!
//! The ledger keeps balances as integer stroops (7 decimal places) and moves
//! them around as decimal strings. Engine-side reserve arithmetic works on
//! `f64` parsed from those strings.

use thiserror::Error;

/// Stroops in one whole unit
pub const STROOPS_PER_UNIT: i64 = 10_000_000;

/// Number of decimal places an amount may carry
pub const AMOUNT_DECIMALS: usize = 7;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AmountError {
    #[error("Invalid amount: {0}")]
    Invalid(String),
    #[error("Amount out of range: {0}")]
    OutOfRange(String),
}

/// Parse a non-negative decimal string into stroops
pub fn parse_amount(value: &str) -> Result<i64, AmountError> {
    let value = value.trim();
    let (whole, fraction) = match value.split_once('.') {
        Some((w, f)) => (w, f),
        None => (value, ""),
    };

    let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if whole.is_empty() && fraction.is_empty()
        || !digits_only(whole)
        || !digits_only(fraction)
        || fraction.len() > AMOUNT_DECIMALS
    {
        return Err(AmountError::Invalid(value.to_string()));
    }

    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| AmountError::OutOfRange(value.to_string()))?
    };
    let padded = format!("{:0<width$}", fraction, width = AMOUNT_DECIMALS);
    let fraction: i64 = padded
        .parse()
        .map_err(|_| AmountError::Invalid(value.to_string()))?;

    whole
        .checked_mul(STROOPS_PER_UNIT)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(|| AmountError::OutOfRange(value.to_string()))
}

/// Render stroops as a decimal string without trailing zeros
pub fn format_amount(stroops: i64) -> String {
    let sign = if stroops < 0 { "-" } else { "" };
    let abs = stroops.unsigned_abs();
    let whole = abs / STROOPS_PER_UNIT as u64;
    let fraction = abs % STROOPS_PER_UNIT as u64;
    if fraction == 0 {
        return format!("{}{}", sign, whole);
    }
    let fraction = format!("{:07}", fraction);
    format!("{}{}.{}", sign, whole, fraction.trim_end_matches('0'))
}

/// Convert a floating point amount to stroops, rounding to 7 places
pub fn amount_from_f64(value: f64) -> Result<i64, AmountError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AmountError::Invalid(value.to_string()));
    }
    let stroops = (value * STROOPS_PER_UNIT as f64).round();
    if stroops > i64::MAX as f64 {
        return Err(AmountError::OutOfRange(value.to_string()));
    }
    Ok(stroops as i64)
}

/// Canonical decimal string for a floating point amount
pub fn format_f64(value: f64) -> Result<String, AmountError> {
    amount_from_f64(value).map(format_amount)
}

/// Lenient parse used for reserve arithmetic; malformed balances count as zero
pub fn balance_to_f64(value: &str) -> f64 {
    value.trim().parse::<f64>().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1").unwrap(), STROOPS_PER_UNIT);
        assert_eq!(parse_amount("0.5").unwrap(), 5_000_000);
        assert_eq!(parse_amount("12.3456789").unwrap(), 123_456_789);
        assert_eq!(parse_amount(".25").unwrap(), 2_500_000);
        assert_eq!(parse_amount("0").unwrap(), 0);
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert!(parse_amount("").is_err());
        assert!(parse_amount(".").is_err());
        assert!(parse_amount("-1").is_err());
        assert!(parse_amount("1.12345678").is_err());
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("99999999999999999999").is_err());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(5_000_000), "0.5");
        assert_eq!(format_amount(STROOPS_PER_UNIT * 3), "3");
        assert_eq!(format_amount(123_456_789), "12.3456789");
        assert_eq!(format_amount(-5_000_000), "-0.5");
    }

    #[test]
    fn test_format_f64() {
        assert_eq!(format_f64(12.33).unwrap(), "12.33");
        assert_eq!(format_f64(1.0).unwrap(), "1");
        assert!(format_f64(-1.0).is_err());
        assert!(format_f64(f64::NAN).is_err());
    }

    #[test]
    fn test_balance_to_f64() {
        assert_eq!(balance_to_f64("3.0000000"), 3.0);
        assert_eq!(balance_to_f64("garbage"), 0.0);
    }
}
