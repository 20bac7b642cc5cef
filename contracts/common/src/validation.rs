//! Validation Helpers
//!
//! Boundary checks for operation inputs. Every check returns an
//! `McrResult` so callers can propagate with `?`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mcr_common::validation::{check, validate_report};
//!
//! check!(amount > 0, McrError::ZeroPayment);
//! validate_report(&input, CurrencyCode::ETH, history.last_report_date())?;
//! ```

use crate::{
    constants::{currency, precision},
    errors::{McrError, McrResult},
    math,
    types::{Address, CurrencyCode, ReportInput},
    Vec,
};

// ============ Validation Macro ============

/// Check a condition and return an error if it fails.
///
/// # Examples
///
/// ```rust,ignore
/// check!(payment > 0, McrError::ZeroPayment);
/// ```
#[macro_export]
macro_rules! check {
    ($condition:expr, $error:expr) => {
        if !($condition) {
            return Err($error);
        }
    };
}

pub use check;

// ============ Report Validation ============

/// Validate a capital-adequacy report before it becomes state.
///
/// # Arguments
///
/// * `input` - The report as submitted
/// * `base_currency` - Currency that must be quoted at par if listed
/// * `previous_report_date` - Date of the last accepted report, if any
///
/// # Errors
///
/// * `InvalidInput` for malformed parameters
/// * `StaleReport` if dated before the previous report
pub fn validate_report(
    input: &ReportInput,
    base_currency: CurrencyCode,
    previous_report_date: Option<u32>,
) -> McrResult<()> {
    check!(
        !input.currency_codes.is_empty(),
        McrError::InvalidInput {
            param: "currency_codes",
            reason: "at least one currency required",
        }
    );
    check!(
        input.currency_codes.len() == input.rates.len(),
        McrError::InvalidInput {
            param: "rates",
            reason: "length must match currency_codes",
        }
    );
    check!(
        input.currency_codes.len() <= currency::MAX_CURRENCIES,
        McrError::InvalidInput {
            param: "currency_codes",
            reason: "too many currencies",
        }
    );
    check!(
        input.rates.iter().all(|r| *r > 0),
        McrError::InvalidInput {
            param: "rates",
            reason: "every rate must be positive",
        }
    );
    require_unique_codes(input)?;
    require_base_rate(input, base_currency)?;

    check!(
        input.required_capital > 0,
        McrError::InvalidInput {
            param: "required_capital",
            reason: "must be positive",
        }
    );
    check!(
        math::is_valid_calendar_date(input.effective_date),
        McrError::InvalidInput {
            param: "effective_date",
            reason: "not a valid YYYYMMDD date",
        }
    );

    if let Some(previous_date) = previous_report_date {
        check!(
            input.effective_date >= previous_date,
            McrError::StaleReport {
                previous_date,
                reported_date: input.effective_date,
            }
        );
    }

    Ok(())
}

fn require_unique_codes(input: &ReportInput) -> McrResult<()> {
    let mut codes: Vec<_> = input.currency_codes.clone();
    codes.sort_unstable();
    check!(
        codes.windows(2).all(|w| w[0] != w[1]),
        McrError::InvalidInput {
            param: "currency_codes",
            reason: "duplicate currency code",
        }
    );
    Ok(())
}

fn require_base_rate(input: &ReportInput, base_currency: CurrencyCode) -> McrResult<()> {
    let base_rate = input
        .currency_codes
        .iter()
        .zip(input.rates.iter())
        .find(|(code, _)| **code == base_currency)
        .map(|(_, rate)| *rate);

    if let Some(rate) = base_rate {
        check!(
            rate == precision::RATE_PRECISION,
            McrError::InvalidInput {
                param: "rates",
                reason: "base currency must be quoted at par",
            }
        );
    }
    Ok(())
}

// ============ Common Helpers ============

/// Require a value to be positive.
pub fn require_positive(value: u64, param: &'static str) -> McrResult<()> {
    if value == 0 {
        return Err(McrError::InvalidParameter { param, value });
    }
    Ok(())
}

/// Require address to not be zero.
pub fn require_valid_address(address: Address, param: &'static str) -> McrResult<()> {
    if address == [0u8; 32] {
        return Err(McrError::InvalidInput {
            param,
            reason: "zero address",
        });
    }
    Ok(())
}
