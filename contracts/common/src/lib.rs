//! Mutual Capital Common Library
//!
//! Shared types, constants, and utilities for all pricing-engine contracts.
//!
//! ## Overview
//!
//! A mutual's utility token is priced from its capital adequacy: the ratio
//! of the pooled fund value to the minimum capital requirement (MCR). As
//! contributions raise the ratio, each further token costs more. This crate
//! holds the pieces every contract shares:
//!
//! - **Types**: currency codes, capital states, curve parameters
//! - **Curve**: spot price and the tranche-walking purchase integral
//! - **Math**: checked fixed-point helpers over a 256-bit intermediate
//! - **Events**: typed event log drained by the host
//! - **Validation**: boundary checks for reports and calibration
//! - **Collaborators**: membership and token-issuance traits
//!
//! This crate is `no_std` compatible when built without the default `std`
//! feature.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

// Re-export collections for submodules based on feature
#[cfg(not(feature = "std"))]
pub use alloc::{collections::BTreeMap, collections::BTreeSet, vec::Vec};
#[cfg(feature = "std")]
pub use std::{collections::BTreeMap, collections::BTreeSet, vec::Vec};

pub mod constants;
pub mod errors;
pub mod types;
pub mod math;
pub mod curve;
pub mod events;
pub mod validation;
pub mod collaborators;

// Re-exports for convenience
pub use errors::*;
pub use types::*;
pub use math::*;
pub use curve::{PricingCurve, TrancheStep};
pub use events::*;
pub use validation::{require_positive, require_valid_address, validate_report};
pub use collaborators::*;
