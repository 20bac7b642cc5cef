//! Core Types for the Pricing Engine
//!
//! Currency codes, capital-adequacy state, curve calibration and the
//! per-operation input/output records shared across all contracts.

use core::fmt;
use core::str::FromStr;

use crate::Vec;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::{curve, precision};
use crate::errors::{McrError, McrResult};

/// Type alias for addresses (32-byte hash)
pub type Address = [u8; 32];

// ============ Currency Types ============

/// Fixed-width currency code: up to 4 ASCII characters, zero padded
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct CurrencyCode(pub [u8; 4]);

impl CurrencyCode {
    /// Ether, the base currency
    pub const ETH: Self = Self(*b"ETH\0");
    /// Dai stablecoin
    pub const DAI: Self = Self(*b"DAI\0");

    /// Parse a 1-4 character uppercase alphanumeric code
    pub fn new(code: &str) -> McrResult<Self> {
        let bytes = code.as_bytes();
        if bytes.is_empty() || bytes.len() > 4 {
            return Err(McrError::InvalidInput {
                param: "currency_code",
                reason: "must be 1-4 characters",
            });
        }
        if !bytes
            .iter()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        {
            return Err(McrError::InvalidInput {
                param: "currency_code",
                reason: "must be uppercase ASCII alphanumeric",
            });
        }
        let mut raw = [0u8; 4];
        raw[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(raw))
    }

    /// Code as text, without padding
    pub fn as_str(&self) -> &str {
        let len = self.0.iter().position(|b| *b == 0).unwrap_or(4);
        core::str::from_utf8(&self.0[..len]).unwrap_or("?")
    }
}

impl FromStr for CurrencyCode {
    type Err = McrError;

    fn from_str(s: &str) -> McrResult<Self> {
        Self::new(s)
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CurrencyCode({})", self.as_str())
    }
}

/// Exchange rate of one currency in a capital snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct CurrencyRate {
    /// Currency code
    pub code: CurrencyCode,
    /// Currency units per base unit, scaled by `RATE_PRECISION`
    pub rate: u64,
}

// ============ Capital State ============

/// How a capital state came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum StateOrigin {
    /// Published by a capital-adequacy report
    #[default]
    Report,
    /// Derived from the previous state by a purchase
    Purchase,
}

/// Immutable capital-adequacy record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct McrState {
    /// Capital ratio in basis points (9000 = 90.00%)
    pub ratio_bps: u64,
    /// Required capital in base units (18 decimals)
    pub required_capital: u128,
    /// Aggregated pool value in base units (18 decimals)
    pub fund_value: u128,
    /// Exchange-rate snapshot, codes unique
    pub currency_rates: Vec<CurrencyRate>,
    /// Effective date as YYYYMMDD
    pub effective_date: u32,
    /// Report or purchase-derived
    pub origin: StateOrigin,
    /// Fraction of a token base unit owed but not yet minted, scaled by
    /// [`precision::MINT_REMAINDER_SCALE`]. Zero after a report.
    pub mint_remainder: u128,
}

impl McrState {
    /// Build the state published by a validated report
    pub fn from_report(input: &ReportInput) -> Self {
        let currency_rates = input
            .currency_codes
            .iter()
            .zip(input.rates.iter())
            .map(|(code, rate)| CurrencyRate { code: *code, rate: *rate })
            .collect();

        Self {
            ratio_bps: input.ratio_bps,
            required_capital: input.required_capital,
            fund_value: input.fund_value,
            currency_rates,
            effective_date: input.effective_date,
            origin: StateOrigin::Report,
            mint_remainder: 0,
        }
    }

    /// Derive the post-purchase state, keeping snapshot and date
    pub fn derive(&self, result: &PurchaseResult) -> Self {
        Self {
            ratio_bps: result.new_ratio_bps,
            fund_value: result.new_fund_value,
            origin: StateOrigin::Purchase,
            mint_remainder: result.mint_remainder,
            ..self.clone()
        }
    }

    /// Exchange rate for a currency in this snapshot
    pub fn rate_of(&self, code: CurrencyCode) -> McrResult<u64> {
        self.currency_rates
            .iter()
            .find(|r| r.code == code)
            .map(|r| r.rate)
            .ok_or(McrError::UnknownCurrency { code })
    }

    /// True if this state was published by a report
    pub fn is_reported(&self) -> bool {
        self.origin == StateOrigin::Report
    }
}

// ============ Curve Calibration ============

/// Calibration values shaping the bonding curve
///
/// The names follow the calibration calls of the reporting protocol
/// (`growthStep`, `scalingFactor`), not their geometric role: the growth
/// step does not set the step width and the scaling factor is not a
/// divisor of the price. See [`crate::curve`] for the formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct CurveParameters {
    /// Divisor of the growth term `required_capital * r^4`. Larger values
    /// flatten the curve. Not a width in ratio-space.
    pub growth_step: u64,
    /// Floor price in 1e-5 base units per token, added to the growth term.
    /// The price grows with it rather than with its inverse.
    pub scaling_factor: u64,
    /// Width of one tranche step in basis points; the only value that
    /// partitions ratio-space
    pub tranche_width_bps: u64,
}

impl Default for CurveParameters {
    fn default() -> Self {
        Self {
            growth_step: curve::DEFAULT_GROWTH_STEP,
            scaling_factor: curve::DEFAULT_SCALING_FACTOR,
            tranche_width_bps: curve::DEFAULT_TRANCHE_WIDTH_BPS,
        }
    }
}

impl CurveParameters {
    /// Create validated parameters
    pub fn new(growth_step: u64, scaling_factor: u64, tranche_width_bps: u64) -> McrResult<Self> {
        Self::default().calibrated(&CalibrationInput {
            growth_step: Some(growth_step),
            scaling_factor: Some(scaling_factor),
            tranche_width_bps: Some(tranche_width_bps),
        })
    }

    /// Copy with every supplied calibration value replaced
    ///
    /// # Errors
    /// `InvalidParameter` if any supplied value is zero; `self` is not used
    /// partially in that case.
    pub fn calibrated(&self, input: &CalibrationInput) -> McrResult<Self> {
        let pick = |param: &'static str, new: Option<u64>, old: u64| match new {
            Some(0) => Err(McrError::InvalidParameter { param, value: 0 }),
            Some(v) => Ok(v),
            None => Ok(old),
        };

        Ok(Self {
            growth_step: pick("growth_step", input.growth_step, self.growth_step)?,
            scaling_factor: pick("scaling_factor", input.scaling_factor, self.scaling_factor)?,
            tranche_width_bps: pick(
                "tranche_width_bps",
                input.tranche_width_bps,
                self.tranche_width_bps,
            )?,
        })
    }

    /// Floor price per token in base units
    pub fn floor_price(&self) -> u128 {
        self.scaling_factor as u128 * precision::DECIMAL_PRECISION / precision::FLOOR_PRICE_DIVISOR
    }
}

// ============ Operation Inputs ============

/// Capital-adequacy report, validated at the boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ReportInput {
    /// Capital ratio in basis points
    pub ratio_bps: u64,
    /// Required capital in base units
    pub required_capital: u128,
    /// Aggregated pool value in base units
    pub fund_value: u128,
    /// Currency codes, parallel to `rates`
    pub currency_codes: Vec<CurrencyCode>,
    /// Exchange rates, parallel to `currency_codes`
    pub rates: Vec<u64>,
    /// Effective date as YYYYMMDD
    pub effective_date: u32,
}

/// Calibration request; `None` keeps the current value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct CalibrationInput {
    pub growth_step: Option<u64>,
    pub scaling_factor: Option<u64>,
    pub tranche_width_bps: Option<u64>,
}

impl CalibrationInput {
    /// Replace only the growth step
    pub fn growth_step(value: u64) -> Self {
        Self { growth_step: Some(value), ..Self::default() }
    }

    /// Replace only the scaling factor
    pub fn scaling_factor(value: u64) -> Self {
        Self { scaling_factor: Some(value), ..Self::default() }
    }
}

// ============ Operation Results ============

/// Outcome of integrating a payment along the curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PurchaseResult {
    /// Tokens obtained, in base units
    pub minted_quantity: u128,
    /// Payment converted to base-currency units
    pub base_amount: u128,
    /// Fund value after the payment
    pub new_fund_value: u128,
    /// Capital ratio after the payment
    pub new_ratio_bps: u64,
    /// Tranche steps touched by the walk
    pub steps_walked: u64,
    /// Unminted fraction carried into the derived state
    pub mint_remainder: u128,
}
