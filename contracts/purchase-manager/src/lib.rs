//! Purchase Manager Contract
//!
//! The pricing engine. Owns the curve calibration, the capital state
//! history and the capital ledger, and mints through the token issuer.
//!
//! ## Single Writer
//!
//! All shared state sits behind one mutex. Every operation runs to
//! completion inside a single lock turn, so concurrent callers observe a
//! total order and a purchase always prices against the state and
//! parameters current when its turn began.
//!
//! ## Purchase Commit
//!
//! A purchase prepares the ledger credit and the derived capital state on
//! copies, then mints. Minting is the last step that can fail; the
//! prepared copies are swapped in only after it succeeds, so a failed
//! purchase leaves nothing behind.

use std::sync::{Mutex, MutexGuard, PoisonError};

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use mcr_capital_pool::CapitalLedger;
use mcr_common::{
    collaborators::{MemberRegistry, MembershipCheck, TokenIssuer},
    constants::{curve, currency},
    curve::PricingCurve,
    errors::{AbortReason, McrError, McrResult},
    events::{EventLog, McrEvent},
    types::{Address, CalibrationInput, CurrencyCode, CurveParameters, McrState, PurchaseResult, ReportInput},
    validation::{require_positive, require_valid_address},
};
use mcr_oracle::McrHistory;
use mcr_token::MutualTokenState;


/// Minter identity the engine presents to the token ledger by default
pub const DEFAULT_MINTER_ID: Address = *b"MCR_PURCHASE_MANAGER_MINTER_V001";

/// Engine wired to the bundled allowlist and token ledger
pub type MutualPricingEngine = PricingEngine<MemberRegistry, MutualTokenState>;

// ============ Engine Config ============

/// Runtime configuration, validated at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct EngineConfig {
    /// Currency fund values and prices are denominated in
    pub base_currency: CurrencyCode,
    /// Initial curve calibration
    pub curve: CurveParameters,
    /// Upper bound on tranche steps a single purchase may cross
    pub max_tranche_steps: u64,
    /// Identity used when minting
    pub minter_id: Address,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_currency: currency::BASE,
            curve: CurveParameters::default(),
            max_tranche_steps: curve::MAX_TRANCHE_STEPS,
            minter_id: DEFAULT_MINTER_ID,
        }
    }
}

impl EngineConfig {
    /// Check every field
    ///
    /// # Errors
    /// - `InvalidParameter` for a zero curve value or step bound
    /// - `InvalidInput` for a zero minter id
    pub fn validate(&self) -> McrResult<()> {
        require_positive(self.curve.growth_step, "growth_step")?;
        require_positive(self.curve.scaling_factor, "scaling_factor")?;
        require_positive(self.curve.tranche_width_bps, "tranche_width_bps")?;
        require_positive(self.max_tranche_steps, "max_tranche_steps")?;
        require_valid_address(self.minter_id, "minter_id")?;
        Ok(())
    }
}

// ============ Engine State ============

/// Everything mutated under the engine lock
#[derive(Debug)]
struct EngineState<T> {
    params: CurveParameters,
    history: McrHistory,
    ledger: CapitalLedger,
    token: T,
    events: EventLog,
}

// ============ Pricing Engine ============

/// Capital-adequacy pricing engine
///
/// Events accumulate in an in-memory log until the host takes them with
/// [`PricingEngine::drain_events`]. Nothing is dropped or rotated, so a
/// long-running host must drain regularly to bound memory.
#[derive(Debug)]
pub struct PricingEngine<M, T> {
    config: EngineConfig,
    membership: M,
    state: Mutex<EngineState<T>>,
}

impl MutualPricingEngine {
    /// Engine with the default configuration and a fresh token ledger
    /// minting to the default minter id
    pub fn with_members(members: MemberRegistry) -> Self {
        let config = EngineConfig::default();
        Self::assemble(config, members, MutualTokenState::new(config.minter_id))
    }
}

impl<M: MembershipCheck, T: TokenIssuer> PricingEngine<M, T> {
    /// Build an engine around its collaborators
    ///
    /// # Errors
    /// Any error from [`EngineConfig::validate`].
    pub fn new(config: EngineConfig, membership: M, token: T) -> McrResult<Self> {
        config.validate()?;
        Ok(Self::assemble(config, membership, token))
    }

    fn assemble(config: EngineConfig, membership: M, token: T) -> Self {
        Self {
            config,
            membership,
            state: Mutex::new(EngineState {
                params: config.curve,
                history: McrHistory::new(config.base_currency),
                ledger: CapitalLedger::new(),
                token,
                events: EventLog::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ============ Reporting ============

    /// Append a reported capital state and make it current
    ///
    /// # Errors
    /// - `InvalidInput` for malformed parameters
    /// - `StaleReport` if dated before the last accepted report
    pub fn report_capital_state(&self, input: &ReportInput) -> McrResult<()> {
        let mut guard = self.lock();
        let engine = &mut *guard;
        engine.history.report(input, &mut engine.events)?;
        Ok(())
    }

    // ============ Calibration ============

    /// Replace any subset of the curve parameters atomically
    ///
    /// # Errors
    /// `InvalidParameter` if a supplied value is zero; nothing changes.
    pub fn calibrate(&self, input: &CalibrationInput) -> McrResult<CurveParameters> {
        let mut engine = self.lock();
        let params = engine.params.calibrated(input)?;

        engine.params = params;
        engine.events.emit(McrEvent::CurveCalibrated {
            growth_step: params.growth_step,
            scaling_factor: params.scaling_factor,
            tranche_width_bps: params.tranche_width_bps,
        });
        info!(
            growth_step = params.growth_step,
            scaling_factor = params.scaling_factor,
            tranche_width_bps = params.tranche_width_bps,
            "curve calibrated"
        );

        Ok(params)
    }

    /// Replace the growth step
    pub fn set_growth_step(&self, value: u64) -> McrResult<()> {
        self.calibrate(&CalibrationInput::growth_step(value)).map(|_| ())
    }

    /// Replace the scaling factor
    pub fn set_scaling_factor(&self, value: u64) -> McrResult<()> {
        self.calibrate(&CalibrationInput::scaling_factor(value)).map(|_| ())
    }

    /// Current curve parameters
    pub fn parameters(&self) -> CurveParameters {
        self.lock().params
    }

    // ============ Pricing ============

    /// Spot price of one token in `code` at the current state
    ///
    /// # Errors
    /// - `StateNotFound` before the first report
    /// - `UnknownCurrency` if `code` is not in the current snapshot
    pub fn spot_price(&self, code: CurrencyCode) -> McrResult<u128> {
        let engine = self.lock();
        let state = engine.history.current().ok_or(McrError::StateNotFound)?;
        self.curve(engine.params).spot_price(code, state)
    }

    /// Price a payment without committing anything
    pub fn quote(&self, amount: u128, code: CurrencyCode) -> McrResult<PurchaseResult> {
        let engine = self.lock();
        let state = engine.history.current().ok_or(McrError::StateNotFound)?;
        self.curve(engine.params).integrate(amount, code, state)
    }

    fn curve(&self, params: CurveParameters) -> PricingCurve {
        PricingCurve::new(params, self.config.max_tranche_steps)
    }

    // ============ Purchase ============

    /// Exchange an escrowed payment for newly minted tokens
    ///
    /// # Returns
    /// The minted quantity
    ///
    /// # Errors
    /// - `NotEligible` if the membership check rejects `payer`
    /// - `StateNotFound` before the first report
    /// - `ZeroPayment` if the payment is worth nothing in the base currency
    /// - `UnknownCurrency` if `code` is not in the current snapshot
    /// - `PurchaseAborted` if any commit step fails; state is unchanged
    pub fn purchase(&self, payer: &Address, amount: u128, code: CurrencyCode) -> McrResult<u128> {
        let outcome = if self.membership.is_eligible(payer) {
            let mut guard = self.lock();
            self.execute_purchase(&mut guard, payer, amount, code)
        } else {
            Err(McrError::NotEligible { payer: *payer })
        };

        match &outcome {
            Ok(result) => info!(
                currency = %code,
                amount,
                minted = result.minted_quantity,
                new_ratio_bps = result.new_ratio_bps,
                steps = result.steps_walked,
                "purchase committed"
            ),
            Err(err) => warn!(currency = %code, amount, error_code = err.code(), "purchase rejected"),
        }

        outcome.map(|result| result.minted_quantity)
    }

    fn execute_purchase(
        &self,
        engine: &mut EngineState<T>,
        payer: &Address,
        amount: u128,
        code: CurrencyCode,
    ) -> McrResult<PurchaseResult> {
        // 1. Snapshot state and parameters for the whole walk
        let snapshot = engine.history.current().ok_or(McrError::StateNotFound)?;
        let result = self.curve(engine.params).integrate(amount, code, snapshot)?;
        debug!(
            base_amount = result.base_amount,
            steps = result.steps_walked,
            new_fund_value = result.new_fund_value,
            "curve walk complete"
        );

        // 2. Prepare the ledger credit and the derived state on copies
        let mut pending = EventLog::new();
        let mut ledger = engine.ledger.clone();
        ledger
            .credit(code, amount, &mut pending)
            .map_err(|_| McrError::PurchaseAborted {
                reason: AbortReason::LedgerRejected,
            })?;
        let record = engine
            .history
            .prepare_derived(&result)
            .map_err(McrError::into_purchase_error)?;

        // 3. Mint, the last fallible step
        let new_total_supply = engine
            .token
            .mint(&self.config.minter_id, payer, result.minted_quantity)
            .map_err(McrError::into_purchase_error)?;

        // 4. Commit
        engine.ledger = ledger;
        engine.history.commit_derived(record, &mut pending);
        pending.emit(McrEvent::TokenMint {
            to: *payer,
            amount: result.minted_quantity,
            new_total_supply,
        });
        pending.emit(McrEvent::TokensPurchased {
            payer: *payer,
            currency: code,
            amount_paid: amount,
            base_amount: result.base_amount,
            minted: result.minted_quantity,
            new_ratio_bps: result.new_ratio_bps,
            steps_walked: result.steps_walked,
        });
        engine.events.absorb(&mut pending);

        Ok(result)
    }

    // ============ Queries ============

    /// Current capital state, if any has been reported
    pub fn current_state(&self) -> Option<McrState> {
        self.lock().history.current().cloned()
    }

    /// Number of recorded capital states, reported and derived
    pub fn state_history_len(&self) -> usize {
        self.lock().history.len()
    }

    /// Effective date of the last accepted report
    pub fn last_report_date(&self) -> Option<u32> {
        self.lock().history.last_report_date()
    }

    /// Recompute the audit digest chain
    pub fn verify_chain(&self) -> bool {
        self.lock().history.verify_chain()
    }

    /// Contributions held in one currency pool
    pub fn pool_balance(&self, code: CurrencyCode) -> u128 {
        self.lock().ledger.balance_of(code)
    }

    /// Contributions across all pools, valued at the current snapshot
    ///
    /// # Errors
    /// - `StateNotFound` before the first report
    /// - `UnknownCurrency` if a held currency is missing from the snapshot
    pub fn pool_value(&self) -> McrResult<u128> {
        let engine = self.lock();
        let state = engine.history.current().ok_or(McrError::StateNotFound)?;
        engine.ledger.fund_value(&state.currency_rates)
    }

    /// Token balance of a holder
    pub fn token_balance(&self, holder: &Address) -> u128 {
        self.lock().token.balance_of(holder)
    }

    /// Tokens in circulation
    pub fn total_supply(&self) -> u128 {
        self.lock().token.total_supply()
    }

    /// Take every event emitted since the last drain
    pub fn drain_events(&self) -> Vec<McrEvent> {
        self.lock().events.drain()
    }
}

// ============ Tests ============
