//! Engine Events
//!
//! Events are collected during each engine operation and can be drained by
//! the host for indexing, auditing or notifications.

use crate::Vec;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use crate::errors::{McrError, McrResult};
use crate::types::{Address, CurrencyCode};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Capital State Events (0x01 - 0x1F)
    CapitalStateReported = 0x01,
    DerivedStateRecorded = 0x02,
    CurveCalibrated = 0x03,

    // Capital Pool Events (0x20 - 0x3F)
    CapitalCredited = 0x20,

    // Token Events (0x40 - 0x5F)
    TokenMint = 0x40,

    // Purchase Events (0x60 - 0x7F)
    TokensPurchased = 0x60,
}

/// All events the pricing engine can emit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum McrEvent {
    // ============ Capital State Events ============

    /// A capital-adequacy report was accepted
    CapitalStateReported {
        sequence: u64,
        ratio_bps: u64,
        required_capital: u128,
        fund_value: u128,
        effective_date: u32,
    },

    /// A purchase appended a derived state
    DerivedStateRecorded {
        sequence: u64,
        ratio_bps: u64,
        fund_value: u128,
        effective_date: u32,
    },

    /// Curve parameters were replaced
    CurveCalibrated {
        growth_step: u64,
        scaling_factor: u64,
        tranche_width_bps: u64,
    },

    // ============ Capital Pool Events ============

    /// Payment credited to the capital pool
    CapitalCredited {
        currency: CurrencyCode,
        amount: u128,
        new_balance: u128,
    },

    // ============ Token Events ============

    /// Tokens minted to a member
    TokenMint {
        to: Address,
        amount: u128,
        new_total_supply: u128,
    },

    // ============ Purchase Events ============

    /// A purchase committed
    TokensPurchased {
        payer: Address,
        currency: CurrencyCode,
        amount_paid: u128,
        base_amount: u128,
        minted: u128,
        new_ratio_bps: u64,
        steps_walked: u64,
    },
}

impl McrEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::CapitalStateReported { .. } => EventType::CapitalStateReported,
            Self::DerivedStateRecorded { .. } => EventType::DerivedStateRecorded,
            Self::CurveCalibrated { .. } => EventType::CurveCalibrated,
            Self::CapitalCredited { .. } => EventType::CapitalCredited,
            Self::TokenMint { .. } => EventType::TokenMint,
            Self::TokensPurchased { .. } => EventType::TokensPurchased,
        }
    }

    /// Serialize event to bytes for storage/transmission
    pub fn to_bytes(&self) -> McrResult<Vec<u8>> {
        borsh::to_vec(self).map_err(|_| McrError::SerializationFailed)
    }

    /// Deserialize event from bytes
    pub fn from_bytes(bytes: &[u8]) -> McrResult<Self> {
        borsh::from_slice(bytes).map_err(|_| McrError::SerializationFailed)
    }
}

/// Event log for collecting multiple events during execution
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<McrEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: McrEvent) {
        self.events.push(event);
    }

    /// Move every event out of `other` into this log
    pub fn absorb(&mut self, other: &mut EventLog) {
        self.events.append(&mut other.events);
    }

    /// Remove and return all events, leaving the log empty
    pub fn drain(&mut self) -> Vec<McrEvent> {
        core::mem::take(&mut self.events)
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&McrEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
