//! Mathematical Utilities for the Pricing Engine
//!
//! Checked fixed-point operations. Products that can exceed `u128` are
//! carried in a 256-bit intermediate and narrowed back with an explicit
//! overflow check.

use crate::constants::{limits, precision};
use crate::errors::{McrError, McrResult};

uint::construct_uint! {
    /// 256-bit unsigned integer for intermediate products
    pub struct U256(4);
}

/// Narrow a 256-bit value back to `u128`
pub fn narrow(value: U256) -> McrResult<u128> {
    if value > U256::from(u128::MAX) {
        return Err(McrError::Overflow);
    }
    Ok(value.low_u128())
}

/// Compute `a * b / c` without intermediate overflow, rounding down
pub fn mul_div(a: u128, b: u128, c: u128) -> McrResult<u128> {
    if c == 0 {
        return Err(McrError::DivisionByZero);
    }
    // u128 * u128 always fits in 256 bits
    let product = U256::from(a) * U256::from(b);
    narrow(product / U256::from(c))
}

/// Compute `a * b / c`, rounding up
pub fn mul_div_ceil(a: u128, b: u128, c: u128) -> McrResult<u128> {
    if c == 0 {
        return Err(McrError::DivisionByZero);
    }
    let product = U256::from(a) * U256::from(b);
    let divisor = U256::from(c);
    let (quotient, remainder) = product.div_mod(divisor);
    let quotient = if remainder.is_zero() {
        quotient
    } else {
        quotient + U256::one()
    };
    narrow(quotient)
}

/// Safe addition with overflow check
pub fn safe_add(a: u128, b: u128) -> McrResult<u128> {
    a.checked_add(b).ok_or(McrError::Overflow)
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u128, b: u128) -> McrResult<u128> {
    a.checked_sub(b).ok_or(McrError::Underflow)
}

/// Capital ratio of a fund against its requirement
///
/// ratio_bps = fund_value * 10000 / required_capital
///
/// # Returns
/// Ratio in basis points (9000 = 90.00%)
pub fn capital_ratio_bps(fund_value: u128, required_capital: u128) -> McrResult<u64> {
    let ratio = mul_div(fund_value, precision::BPS_DENOMINATOR, required_capital)?;
    u64::try_from(ratio).map_err(|_| McrError::Overflow)
}

/// Convert a currency amount into base-currency units
///
/// base = amount * RATE_PRECISION / rate
///
/// # Arguments
/// * `amount` - Amount in the currency's base units
/// * `rate` - Currency units per base unit, scaled by `RATE_PRECISION`
pub fn to_base_amount(amount: u128, rate: u64) -> McrResult<u128> {
    mul_div(amount, precision::RATE_PRECISION as u128, rate as u128)
}

/// Convert a base-currency amount into a currency
///
/// amount = base * rate / RATE_PRECISION
pub fn from_base_amount(base_amount: u128, rate: u64) -> McrResult<u128> {
    mul_div(base_amount, rate as u128, precision::RATE_PRECISION as u128)
}

/// Smallest currency amount worth at least `base_amount`
pub fn from_base_amount_ceil(base_amount: u128, rate: u64) -> McrResult<u128> {
    mul_div_ceil(base_amount, rate as u128, precision::RATE_PRECISION as u128)
}

/// Check a YYYYMMDD date against the Gregorian calendar
pub fn is_valid_calendar_date(date: u32) -> bool {
    if !(limits::MIN_EFFECTIVE_DATE..=limits::MAX_EFFECTIVE_DATE).contains(&date) {
        return false;
    }

    let year = date / 10_000;
    let month = (date / 100) % 100;
    let day = date % 100;

    let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
    let days_in_month = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if leap => 29,
        2 => 28,
        _ => return false,
    };

    (1..=days_in_month).contains(&day)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_ETH: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn test_mul_div_wide_intermediate() {
        // u128::MAX * 10 / 10 overflows a plain u128 product
        assert_eq!(mul_div(u128::MAX, 10, 10).unwrap(), u128::MAX);
        assert_eq!(mul_div(7, 3, 2).unwrap(), 10);
        assert_eq!(mul_div_ceil(7, 3, 2).unwrap(), 11);
        assert_eq!(mul_div_ceil(6, 3, 2).unwrap(), 9);
    }

    #[test]
    fn test_mul_div_errors() {
        assert_eq!(mul_div(1, 1, 0), Err(McrError::DivisionByZero));
        assert_eq!(mul_div(u128::MAX, 2, 1), Err(McrError::Overflow));
    }

    #[test]
    fn test_capital_ratio() {
        // 90 ETH against 100 ETH required = 90.00%
        assert_eq!(capital_ratio_bps(90 * ONE_ETH, 100 * ONE_ETH).unwrap(), 9000);
        assert_eq!(capital_ratio_bps(10 * ONE_ETH, 100 * ONE_ETH).unwrap(), 1000);
        assert_eq!(capital_ratio_bps(1, 0), Err(McrError::DivisionByZero));
    }

    #[test]
    fn test_rate_conversion() {
        // 155.17 DAI per ETH
        assert_eq!(to_base_amount(15_517 * ONE_ETH, 15_517).unwrap(), 100 * ONE_ETH);
        assert_eq!(from_base_amount(100 * ONE_ETH, 15_517).unwrap(), 15_517 * ONE_ETH);
        // Base currency is an identity conversion
        assert_eq!(to_base_amount(ONE_ETH, 100).unwrap(), ONE_ETH);

        // 1 base unit is 155.17 DAI units
        assert_eq!(from_base_amount(1, 15_517).unwrap(), 155);
        assert_eq!(from_base_amount_ceil(1, 15_517).unwrap(), 156);
        assert_eq!(from_base_amount_ceil(100, 15_517).unwrap(), 15_517);
    }

    #[test]
    fn test_calendar_dates() {
        assert!(is_valid_calendar_date(20190219));
        assert!(is_valid_calendar_date(20200229)); // leap year
        assert!(is_valid_calendar_date(20000229)); // divisible by 400

        assert!(!is_valid_calendar_date(20190229));
        assert!(!is_valid_calendar_date(19000229));
        assert!(!is_valid_calendar_date(20191301));
        assert!(!is_valid_calendar_date(20190100));
        assert!(!is_valid_calendar_date(20190431));
        assert!(!is_valid_calendar_date(0));
    }
}
