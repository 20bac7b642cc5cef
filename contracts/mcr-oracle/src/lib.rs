//! Capital-Adequacy Oracle
//!
//! Holds the append-only history of capital states. A state enters the
//! history either from an external capital-adequacy report or as the
//! derived result of a purchase.
//!
//! ## Audit Chain
//!
//! Every record carries a digest over its predecessor:
//!
//! ```text
//! digest_n = SHA-256(digest_{n-1} || sequence_le || borsh(state_n))
//! ```
//!
//! with an all-zero digest before the first record. `verify_chain`
//! recomputes every link.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use mcr_common::{
    constants::currency,
    errors::{McrError, McrResult},
    events::{EventLog, McrEvent},
    types::{CurrencyCode, McrState, PurchaseResult, ReportInput},
    validation::validate_report,
};

/// Digest preceding the first record
pub const GENESIS_DIGEST: [u8; 32] = [0u8; 32];

// ============ State Records ============

/// One committed capital state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct StateRecord {
    /// Position in the history, starting at 0
    pub sequence: u64,
    /// The capital state
    pub state: McrState,
    /// Chain digest up to and including this record
    pub digest: [u8; 32],
}

impl StateRecord {
    /// Build the record that follows `previous_digest` at `sequence`
    pub fn chained(previous_digest: &[u8; 32], sequence: u64, state: McrState) -> McrResult<Self> {
        let digest = chain_digest(previous_digest, sequence, &state)?;
        Ok(Self { sequence, state, digest })
    }
}

// ============ History ============

/// Append-only capital state history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct McrHistory {
    /// Currency every reported value is denominated in
    pub base_currency: CurrencyCode,
    records: Vec<StateRecord>,
    last_report_date: Option<u32>,
}

impl Default for McrHistory {
    fn default() -> Self {
        Self::new(currency::BASE)
    }
}

impl McrHistory {
    /// Create an empty history denominated in `base_currency`
    pub fn new(base_currency: CurrencyCode) -> Self {
        Self {
            base_currency,
            records: Vec::new(),
            last_report_date: None,
        }
    }

    /// Accept a capital-adequacy report as the new current state
    ///
    /// # Errors
    /// - `InvalidInput` for malformed parameters
    /// - `StaleReport` if dated before the last accepted report
    pub fn report(&mut self, input: &ReportInput, events: &mut EventLog) -> McrResult<&McrState> {
        // 1. Validate at the boundary
        if let Err(err) = validate_report(input, self.base_currency, self.last_report_date) {
            warn!(error_code = err.code(), date = input.effective_date, "capital report rejected");
            return Err(err);
        }

        // 2. Chain the new record
        let record = StateRecord::chained(&self.head_digest(), self.next_sequence(), McrState::from_report(input))?;

        // 3. Emit event
        events.emit(McrEvent::CapitalStateReported {
            sequence: record.sequence,
            ratio_bps: input.ratio_bps,
            required_capital: input.required_capital,
            fund_value: input.fund_value,
            effective_date: input.effective_date,
        });
        info!(
            sequence = record.sequence,
            ratio_bps = input.ratio_bps,
            effective_date = input.effective_date,
            currencies = input.currency_codes.len(),
            "capital state reported"
        );

        self.last_report_date = Some(input.effective_date);
        self.records.push(record);
        Ok(&self.records[self.records.len() - 1].state)
    }

    /// Prepare the derived state a purchase would append
    ///
    /// Nothing is recorded until the returned record is passed to
    /// [`McrHistory::commit_derived`].
    ///
    /// # Errors
    /// - `StateNotFound` if nothing has been reported
    pub fn prepare_derived(&self, result: &PurchaseResult) -> McrResult<StateRecord> {
        let current = self.current().ok_or(McrError::StateNotFound)?;
        StateRecord::chained(&self.head_digest(), self.next_sequence(), current.derive(result))
    }

    /// Append a record produced by [`McrHistory::prepare_derived`]
    ///
    /// The history must not have changed since the record was prepared.
    pub fn commit_derived(&mut self, record: StateRecord, events: &mut EventLog) {
        debug_assert_eq!(record.sequence, self.next_sequence());

        events.emit(McrEvent::DerivedStateRecorded {
            sequence: record.sequence,
            ratio_bps: record.state.ratio_bps,
            fund_value: record.state.fund_value,
            effective_date: record.state.effective_date,
        });
        self.records.push(record);
    }

    // ============ Queries ============

    /// Most recent state, reported or derived
    pub fn current(&self) -> Option<&McrState> {
        self.records.last().map(|r| &r.state)
    }

    /// Effective date of the last accepted report
    pub fn last_report_date(&self) -> Option<u32> {
        self.last_report_date
    }

    /// Digest of the newest record, or the genesis digest
    pub fn head_digest(&self) -> [u8; 32] {
        self.records
            .last()
            .map(|r| r.digest)
            .unwrap_or(GENESIS_DIGEST)
    }

    /// Number of recorded states
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing has been reported
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Recompute every digest and check sequence numbering
    pub fn verify_chain(&self) -> bool {
        let mut previous = GENESIS_DIGEST;
        for (index, record) in self.records.iter().enumerate() {
            if record.sequence != index as u64 {
                return false;
            }
            match chain_digest(&previous, record.sequence, &record.state) {
                Ok(digest) if digest == record.digest => previous = digest,
                _ => return false,
            }
        }
        true
    }

    fn next_sequence(&self) -> u64 {
        self.records.len() as u64
    }
}

// ============ Helper Functions ============

/// Digest linking a state to its predecessor
pub fn chain_digest(previous: &[u8; 32], sequence: u64, state: &McrState) -> McrResult<[u8; 32]> {
    let encoded = borsh::to_vec(state).map_err(|_| McrError::SerializationFailed)?;

    let mut hasher = Sha256::new();
    hasher.update(previous);
    hasher.update(sequence.to_le_bytes());
    hasher.update(&encoded);
    let result = hasher.finalize();
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&result);
    Ok(digest)
}

// ============ Tests ============
