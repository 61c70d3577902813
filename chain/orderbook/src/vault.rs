//! Vault ledger: 18-decimal balances keyed by (owner, token, vault id)
//!
//! A vault comes into existence the first time anything references it (an
//! order registration, a deposit, a bounty credit) and is never removed.
//! Debits saturate at zero; credits are checked.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VaultKey {
    pub owner: Address,
    pub token: Address,
    pub vault_id: U256,
}

impl VaultKey {
    pub fn new(owner: Address, token: Address, vault_id: U256) -> Self {
        Self {
            owner,
            token,
            vault_id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VaultLedger {
    balances: HashMap<VaultKey, U256>,
}

impl VaultLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the vault at zero if it does not exist yet.
    pub fn touch(&mut self, key: VaultKey) {
        self.balances.entry(key).or_insert(U256::ZERO);
    }

    pub fn exists(&self, key: &VaultKey) -> bool {
        self.balances.contains_key(key)
    }

    /// Balance of an existing vault.
    pub fn get(&self, key: &VaultKey) -> Option<U256> {
        self.balances.get(key).copied()
    }

    /// Balance, zero for vaults never created.
    pub fn balance(&self, key: &VaultKey) -> U256 {
        self.get(key).unwrap_or(U256::ZERO)
    }

    // ───────────────────────── Safe Transfer ─────────────────────────

    /// Add `amount`, creating the vault if needed. Returns the new balance.
    pub fn credit(&mut self, key: VaultKey, amount: U256) -> Result<U256, LedgerError> {
        let current = self.balances.entry(key).or_insert(U256::ZERO);
        *current = current.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok(*current)
    }

    /// Subtract up to `amount`, clamped at zero. Returns the amount removed.
    pub fn debit_saturating(&mut self, key: VaultKey, amount: U256) -> U256 {
        let current = self.balances.entry(key).or_insert(U256::ZERO);
        let taken = (*current).min(amount);
        *current -= taken;
        taken
    }

    /// Vaults owned by `owner`, in key order.
    pub fn owned_by(&self, owner: &Address) -> Vec<(VaultKey, U256)> {
        let mut vaults: Vec<_> = self
            .balances
            .iter()
            .filter(|(key, _)| key.owner == *owner)
            .map(|(key, balance)| (*key, *balance))
            .collect();
        vaults.sort();
        vaults
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}
