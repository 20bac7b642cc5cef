//! Capital Pool Ledger
//!
//! Bookkeeping for contributions already escrowed by the custody layer.
//! Balances are kept per currency and aggregated into a single
//! base-currency fund value on demand.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::debug;

use mcr_common::{
    errors::{McrError, McrResult},
    events::{EventLog, McrEvent},
    math,
    types::{CurrencyCode, CurrencyRate},
    BTreeMap,
};

// ============ Ledger State ============

/// Per-currency pooled balances
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct CapitalLedger {
    balances: BTreeMap<CurrencyCode, u128>,
}

impl CapitalLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit a contribution to a currency pool
    ///
    /// # Returns
    /// The pool's new balance
    ///
    /// # Errors
    /// - `ZeroPayment` if `amount` is zero
    /// - `Overflow` if the balance would exceed `u128::MAX`; the ledger is
    ///   unchanged in that case
    pub fn credit(&mut self, code: CurrencyCode, amount: u128, events: &mut EventLog) -> McrResult<u128> {
        if amount == 0 {
            return Err(McrError::ZeroPayment);
        }

        let current = self.balance_of(code);
        let new_balance = math::safe_add(current, amount)?;
        self.balances.insert(code, new_balance);

        events.emit(McrEvent::CapitalCredited {
            currency: code,
            amount,
            new_balance,
        });
        debug!(currency = %code, amount, new_balance, "capital credited");

        Ok(new_balance)
    }

    /// Balance of one currency pool (zero if never credited)
    pub fn balance_of(&self, code: CurrencyCode) -> u128 {
        self.balances.get(&code).copied().unwrap_or(0)
    }

    /// Currencies with a non-zero balance
    pub fn currencies(&self) -> impl Iterator<Item = &CurrencyCode> {
        self.balances.keys()
    }

    /// Aggregate every pool into base-currency units
    ///
    /// # Errors
    /// - `UnknownCurrency` if a held currency has no rate in `rates`
    /// - `Overflow` if the total exceeds `u128::MAX`
    pub fn fund_value(&self, rates: &[CurrencyRate]) -> McrResult<u128> {
        self.balances.iter().try_fold(0u128, |total, (code, balance)| {
            let rate = rates
                .iter()
                .find(|r| r.code == *code)
                .map(|r| r.rate)
                .ok_or(McrError::UnknownCurrency { code: *code })?;
            math::safe_add(total, math::to_base_amount(*balance, rate)?)
        })
    }

    /// True if nothing has been credited
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}

// ============ Tests ============
