//! Protocol Constants
//!
//! Fixed-point scales and default calibration values for the pricing engine.
//! All token and capital amounts carry 18 decimals, ratios are basis points
//! (10_000 = 100.00%) and exchange rates carry 2 decimals.

/// Token Metadata
pub mod token {
    /// Token name
    pub const NAME: &str = "Mutual Capital Token";
    /// Token symbol
    pub const SYMBOL: &str = "MCT";
    /// Decimal places (matches the payment asset's base unit)
    pub const DECIMALS: u8 = 18;
    /// One unit with decimals (1 token = 1e18 base units)
    pub const ONE: u128 = 1_000_000_000_000_000_000;
    /// Default supply cap (one billion tokens)
    pub const MAX_SUPPLY: u128 = 1_000_000_000 * ONE;
}

/// Precision constants
pub mod precision {
    /// High precision for amounts and prices (1e18)
    pub const DECIMAL_PRECISION: u128 = 1_000_000_000_000_000_000;

    /// Basis points denominator (10_000 = 100%)
    pub const BPS_DENOMINATOR: u128 = 10_000;

    /// Exchange-rate precision: rates are quoted as currency units per one
    /// base-currency unit, scaled by 100 (the base currency itself is 100)
    pub const RATE_PRECISION: u64 = 100;

    /// The floor price is expressed in 1e-5 base-currency units per token
    pub const FLOOR_PRICE_DIVISOR: u128 = 100_000;

    /// Sub-unit scale of the mint remainder carried between purchases
    pub const MINT_REMAINDER_SCALE: u128 = 1_000_000_000_000_000_000;
}

/// Curve calibration defaults
pub mod curve {
    /// Divisor of the growth term. Larger values flatten the curve.
    pub const DEFAULT_GROWTH_STEP: u64 = 5_203_349;

    /// Floor price in 1e-5 base-currency units (1948 = 0.01948 ETH)
    pub const DEFAULT_SCALING_FACTOR: u64 = 1_948;

    /// Width of one tranche step in ratio-space (10 bps = 0.10%)
    pub const DEFAULT_TRANCHE_WIDTH_BPS: u64 = 10;

    /// Exponent applied to the capital ratio in the growth term
    pub const RATIO_EXPONENT: u32 = 4;

    /// Upper bound on tranche steps walked by a single purchase
    pub const MAX_TRANCHE_STEPS: u64 = 1_000_000;
}

/// Currency configuration
pub mod currency {
    use crate::types::CurrencyCode;

    /// Base currency every fund value and price is denominated in
    pub const BASE: CurrencyCode = CurrencyCode::ETH;

    /// Maximum number of currencies in one capital snapshot
    pub const MAX_CURRENCIES: usize = 16;
}

/// Reporting limits
pub mod limits {
    /// Earliest accepted effective date (YYYYMMDD)
    pub const MIN_EFFECTIVE_DATE: u32 = 1970_01_01;

    /// Latest accepted effective date (YYYYMMDD)
    pub const MAX_EFFECTIVE_DATE: u32 = 9999_12_31;
}
