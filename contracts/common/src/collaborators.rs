//! External Collaborators
//!
//! The engine does not own membership or token issuance. It reaches both
//! through these traits so hosts can plug in their own registries.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::McrResult;
use crate::types::Address;
use crate::BTreeSet;

/// Decides whether a payer may transact
pub trait MembershipCheck {
    fn is_eligible(&self, payer: &Address) -> bool;
}

/// Issues tokens on behalf of the engine
///
/// `mint` must either credit the full amount or fail without any change.
pub trait TokenIssuer {
    /// Mint `amount` to `to` on behalf of `minter`, returning the new total
    /// supply
    fn mint(&mut self, minter: &Address, to: &Address, amount: u128) -> McrResult<u128>;

    /// Balance held by `holder`
    fn balance_of(&self, holder: &Address) -> u128;

    /// Tokens in circulation
    fn total_supply(&self) -> u128;
}

/// Allowlist of members cleared to transact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct MemberRegistry {
    members: BTreeSet<Address>,
}

impl MemberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a member. Returns false if already admitted.
    pub fn admit(&mut self, member: Address) -> bool {
        self.members.insert(member)
    }

    /// Revoke a member. Returns false if not a member.
    pub fn revoke(&mut self, member: &Address) -> bool {
        self.members.remove(member)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl MembershipCheck for MemberRegistry {
    fn is_eligible(&self, payer: &Address) -> bool {
        self.members.contains(payer)
    }
}

impl FromIterator<Address> for MemberRegistry {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        Self {
            members: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admit_and_revoke() {
        let alice = [1u8; 32];
        let bob = [2u8; 32];
        let mut registry = MemberRegistry::new();

        assert!(!registry.is_eligible(&alice));
        assert!(registry.admit(alice));
        assert!(!registry.admit(alice));
        assert!(registry.is_eligible(&alice));
        assert!(!registry.is_eligible(&bob));

        assert!(registry.revoke(&alice));
        assert!(!registry.revoke(&alice));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_from_iter() {
        let registry: MemberRegistry = [[1u8; 32], [2u8; 32]].into_iter().collect();
        assert_eq!(registry.len(), 2);
        assert!(registry.is_eligible(&[2u8; 32]));
    }
}
