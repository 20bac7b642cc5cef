//! Error Types for the Pricing Engine
//!
//! Typed errors with stable codes. Every error is local to the failing
//! operation and leaves shared state untouched, so callers may retry with
//! corrected input.

use crate::types::{Address, CurrencyCode};

/// Result type alias for engine operations
pub type McrResult<T> = Result<T, McrError>;

/// Main error enum for all pricing engine errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum McrError {
    // ============ Input Errors ============
    /// Malformed report or request parameter
    #[error("invalid input `{param}`: {reason}")]
    InvalidInput {
        param: &'static str,
        reason: &'static str,
    },

    /// Capital report dated before the previous report
    #[error("stale report: dated {reported_date}, previous report {previous_date}")]
    StaleReport {
        previous_date: u32,
        reported_date: u32,
    },

    /// Non-positive calibration value
    #[error("invalid curve parameter `{param}` = {value}")]
    InvalidParameter { param: &'static str, value: u64 },

    /// Currency code absent from the current snapshot
    #[error("unknown currency {code}")]
    UnknownCurrency { code: CurrencyCode },

    // ============ Purchase Errors ============
    /// Payer rejected by the membership collaborator
    #[error("payer {payer:02x?} is not eligible to transact")]
    NotEligible { payer: Address },

    /// Payment is zero (or rounds to zero base units)
    #[error("payment amount must be positive")]
    ZeroPayment,

    /// Purchase rolled back before commit
    #[error("purchase aborted: {reason:?}")]
    PurchaseAborted { reason: AbortReason },

    /// Token ledger refused a mint
    #[error("mint rejected: {reason}")]
    MintRejected { reason: &'static str },

    // ============ State Errors ============
    /// No capital state has been reported yet
    #[error("no capital state reported")]
    StateNotFound,

    /// Record could not be encoded or decoded
    #[error("serialization failed")]
    SerializationFailed,

    // ============ Math Errors ============
    /// Arithmetic overflow occurred
    #[error("arithmetic overflow")]
    Overflow,

    /// Arithmetic underflow occurred
    #[error("arithmetic underflow")]
    Underflow,

    /// Division by zero
    #[error("division by zero")]
    DivisionByZero,
}

/// Why a purchase was rolled back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// Fixed-point overflow while walking the curve
    ArithmeticOverflow,
    /// Curve walk would exceed the configured step bound
    StepLimitExceeded,
    /// Token ledger refused the mint
    MintRejected,
    /// Capital ledger refused the credit
    LedgerRejected,
}

impl McrError {
    /// Returns a human-readable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "E001_INVALID_INPUT",
            Self::StaleReport { .. } => "E002_STALE_REPORT",
            Self::InvalidParameter { .. } => "E003_INVALID_PARAM",
            Self::UnknownCurrency { .. } => "E004_UNKNOWN_CURRENCY",
            Self::NotEligible { .. } => "E010_NOT_ELIGIBLE",
            Self::ZeroPayment => "E011_ZERO_PAYMENT",
            Self::PurchaseAborted { .. } => "E012_PURCHASE_ABORTED",
            Self::MintRejected { .. } => "E013_MINT_REJECTED",
            Self::StateNotFound => "E020_STATE_NOT_FOUND",
            Self::SerializationFailed => "E021_SERIALIZATION",
            Self::Overflow => "E030_OVERFLOW",
            Self::Underflow => "E031_UNDERFLOW",
            Self::DivisionByZero => "E032_DIV_ZERO",
        }
    }

    /// True for raw arithmetic failures
    pub fn is_arithmetic(&self) -> bool {
        matches!(self, Self::Overflow | Self::Underflow | Self::DivisionByZero)
    }

    /// Convert arithmetic failures into a purchase abort, pass the rest through
    pub fn into_purchase_error(self) -> Self {
        match self {
            e if e.is_arithmetic() => Self::PurchaseAborted {
                reason: AbortReason::ArithmeticOverflow,
            },
            Self::MintRejected { .. } => Self::PurchaseAborted {
                reason: AbortReason::MintRejected,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_error_codes_unique() {
        let errors = [
            McrError::InvalidInput { param: "rates", reason: "empty" },
            McrError::StaleReport { previous_date: 20190220, reported_date: 20190219 },
            McrError::InvalidParameter { param: "growth_step", value: 0 },
            McrError::UnknownCurrency { code: CurrencyCode::DAI },
            McrError::NotEligible { payer: [0u8; 32] },
            McrError::ZeroPayment,
            McrError::PurchaseAborted { reason: AbortReason::StepLimitExceeded },
            McrError::MintRejected { reason: "cap" },
            McrError::StateNotFound,
            McrError::SerializationFailed,
            McrError::Overflow,
            McrError::Underflow,
            McrError::DivisionByZero,
        ];

        let codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        let unique: BTreeSet<_> = codes.iter().collect();
        assert_eq!(codes.len(), unique.len(), "Error codes must be unique");
    }

    #[test]
    fn test_arithmetic_errors_become_aborts() {
        assert_eq!(
            McrError::Overflow.into_purchase_error(),
            McrError::PurchaseAborted { reason: AbortReason::ArithmeticOverflow }
        );
        assert_eq!(
            McrError::MintRejected { reason: "cap" }.into_purchase_error(),
            McrError::PurchaseAborted { reason: AbortReason::MintRejected }
        );
        assert_eq!(McrError::ZeroPayment.into_purchase_error(), McrError::ZeroPayment);
    }

    #[test]
    fn test_display_mentions_context() {
        let err = McrError::UnknownCurrency { code: CurrencyCode::DAI };
        assert_eq!(err.to_string(), "unknown currency DAI");
    }
}
