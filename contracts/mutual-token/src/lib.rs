//! Mutual Token Contract
//!
//! Ledger for the mutual's utility token. Tokens are only ever created by
//! the authorized minter (the purchase manager); there is no transfer or
//! burn path in this ledger.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::debug;

use mcr_common::{
    collaborators::TokenIssuer,
    constants::token,
    errors::{McrError, McrResult},
    types::Address,
    BTreeMap,
};

// ============ Token State ============

/// Token supply and holder balances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct MutualTokenState {
    /// Only address allowed to mint
    pub authorized_minter: Address,
    /// Total supply tracking
    pub total_supply: u128,
    /// Supply cap
    pub max_supply: u128,
    balances: BTreeMap<Address, u128>,
}

// NOTE: Default intentionally NOT implemented so a minter is always chosen
// explicitly.

impl MutualTokenState {
    /// Create new token state with authorized minter and the default cap
    pub fn new(authorized_minter: Address) -> Self {
        Self::with_max_supply(authorized_minter, token::MAX_SUPPLY)
    }

    /// Create new token state with an explicit supply cap
    pub fn with_max_supply(authorized_minter: Address, max_supply: u128) -> Self {
        Self {
            authorized_minter,
            total_supply: 0,
            max_supply,
            balances: BTreeMap::new(),
        }
    }

    /// Get token name
    pub fn name() -> &'static str {
        token::NAME
    }

    /// Get token symbol
    pub fn symbol() -> &'static str {
        token::SYMBOL
    }

    /// Get token decimals
    pub fn decimals() -> u8 {
        token::DECIMALS
    }

    /// Number of holders with a balance
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }
}

impl TokenIssuer for MutualTokenState {
    /// Mint new tokens to a holder
    ///
    /// # Errors
    /// `MintRejected` if the caller is not the authorized minter, the amount
    /// is zero, or the supply cap would be exceeded. State is unchanged on
    /// every error.
    fn mint(&mut self, minter: &Address, to: &Address, amount: u128) -> McrResult<u128> {
        // 1. Caller must be authorized minter
        if *minter != self.authorized_minter {
            return Err(McrError::MintRejected {
                reason: "unauthorized minter",
            });
        }

        // 2. Amount must be positive
        if amount == 0 {
            return Err(McrError::MintRejected {
                reason: "zero amount",
            });
        }

        // 3. Supply cap
        let new_supply = self
            .total_supply
            .checked_add(amount)
            .filter(|s| *s <= self.max_supply)
            .ok_or(McrError::MintRejected {
                reason: "supply cap exceeded",
            })?;

        // balance <= total_supply, so this cannot overflow once the cap holds
        let balance = self.balance_of(to) + amount;

        self.total_supply = new_supply;
        self.balances.insert(*to, balance);
        debug!(amount, new_supply, "tokens minted");

        Ok(new_supply)
    }

    fn balance_of(&self, holder: &Address) -> u128 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    fn total_supply(&self) -> u128 {
        self.total_supply
    }
}

// ============ Tests ============
