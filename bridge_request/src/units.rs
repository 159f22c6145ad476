//! Conversion between human-readable decimal amounts and token base units.

use crate::error::{RequestError, Result};

/// Parse a decimal string such as `"12.5"` into base units of a token with
/// `decimals` fractional digits.
///
/// Only plain unsigned decimals are accepted: no sign, whitespace, exponent
/// or thousands separators, and at least one digit on each side of a dot.
pub fn parse_units(amount: &str, decimals: u8) -> Result<u128> {
    let invalid = || RequestError::InvalidAmount(amount.to_string());

    let (whole, fraction) = match amount.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (amount, ""),
    };
    let has_dot = amount.contains('.');

    if whole.is_empty() || (has_dot && fraction.is_empty()) {
        return Err(invalid());
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }
    if fraction.len() > decimals as usize {
        return Err(RequestError::TooManyDecimals {
            given: fraction.len(),
            max: decimals,
        });
    }

    let scale = 10u128
        .checked_pow(decimals as u32)
        .ok_or(RequestError::AmountOverflow)?;
    let whole_units = digits_value(whole)?
        .checked_mul(scale)
        .ok_or(RequestError::AmountOverflow)?;

    let mut fraction_units = digits_value(fraction)?;
    for _ in fraction.len()..decimals as usize {
        fraction_units = fraction_units
            .checked_mul(10)
            .ok_or(RequestError::AmountOverflow)?;
    }

    whole_units
        .checked_add(fraction_units)
        .ok_or(RequestError::AmountOverflow)
}

/// Render base units as a decimal string without trailing fractional zeros.
pub fn format_units(value: u128, decimals: u8) -> String {
    let decimals = decimals as usize;
    let digits = format!("{:0>width$}", value, width = decimals + 1);
    let (whole, fraction) = digits.split_at(digits.len() - decimals);
    let fraction = fraction.trim_end_matches('0');

    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}

fn digits_value(digits: &str) -> Result<u128> {
    let mut value = 0u128;
    for b in digits.bytes() {
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add((b - b'0') as u128))
            .ok_or(RequestError::AmountOverflow)?;
    }
    Ok(value)
}
