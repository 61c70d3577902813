//! Simulated ERC-20 table
//!
//! Balances here are in each token's native decimals. Vaults hold 18-decimal
//! amounts; conversion happens at the deposit and withdraw boundary.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub decimals: u8,
    pub total_supply: U256,
    balances: HashMap<Address, U256>,
}

impl Token {
    pub fn new(decimals: u8) -> Self {
        Self {
            decimals,
            ..Self::default()
        }
    }

    pub fn balance_of(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or(U256::ZERO)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedChain {
    tokens: HashMap<Address, Token>,
}

impl SimulatedChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token. Re-registering keeps existing balances.
    pub fn register(&mut self, token: Address, decimals: u8) {
        self.tokens.entry(token).or_insert_with(|| Token::new(decimals));
    }

    pub fn token(&self, token: &Address) -> Option<&Token> {
        self.tokens.get(token)
    }

    pub fn decimals(&self, token: &Address) -> Option<u8> {
        self.tokens.get(token).map(|t| t.decimals)
    }

    pub fn balance_of(&self, token: &Address, account: &Address) -> U256 {
        self.tokens
            .get(token)
            .map(|t| t.balance_of(account))
            .unwrap_or(U256::ZERO)
    }

    pub fn total_supply(&self, token: &Address) -> U256 {
        self.tokens
            .get(token)
            .map(|t| t.total_supply)
            .unwrap_or(U256::ZERO)
    }

    fn token_mut(&mut self, token: Address) -> Result<&mut Token, LedgerError> {
        self.tokens
            .get_mut(&token)
            .ok_or(LedgerError::UnknownToken { token })
    }

    /// Create `units` out of nothing for `to`.
    pub fn mint(&mut self, token: Address, to: Address, units: U256) -> Result<(), LedgerError> {
        let entry = self.token_mut(token)?;
        entry.total_supply = entry
            .total_supply
            .checked_add(units)
            .ok_or(LedgerError::Overflow)?;
        let balance = entry.balances.entry(to).or_insert(U256::ZERO);
        *balance = balance.checked_add(units).ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    /// Move `units` from `from` to `to`; fails when `from` is short.
    pub fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        units: U256,
    ) -> Result<(), LedgerError> {
        let entry = self.token_mut(token)?;
        let available = entry.balance_of(&from);
        if available < units {
            return Err(LedgerError::InsufficientBalance {
                token,
                account: from,
                required: units,
                available,
            });
        }
        entry.balances.insert(from, available - units);
        let balance = entry.balances.entry(to).or_insert(U256::ZERO);
        *balance = balance.checked_add(units).ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    /// Credit `to` in full and debit `from` clamped at zero.
    ///
    /// Returns the amount actually taken from `from`.
    pub fn transfer_saturating(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        units: U256,
    ) -> Result<U256, LedgerError> {
        let entry = self.token_mut(token)?;
        let available = entry.balance_of(&from);
        let taken = available.min(units);
        entry.balances.insert(from, available - taken);
        let balance = entry.balances.entry(to).or_insert(U256::ZERO);
        *balance = balance.checked_add(units).ok_or(LedgerError::Overflow)?;
        Ok(taken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TKN: Address = Address::repeat_byte(0x01);
    const ALICE: Address = Address::repeat_byte(0xa1);
    const BOB: Address = Address::repeat_byte(0xb0);

    fn chain() -> SimulatedChain {
        let mut chain = SimulatedChain::new();
        chain.register(TKN, 6);
        chain.mint(TKN, ALICE, U256::from(100u64)).unwrap();
        chain
    }

    #[test]
    fn test_mint_tracks_supply() {
        let chain = chain();
        assert_eq!(chain.total_supply(&TKN), U256::from(100u64));
        assert_eq!(chain.balance_of(&TKN, &ALICE), U256::from(100u64));
        assert_eq!(chain.decimals(&TKN), Some(6));
    }

    #[test]
    fn test_transfer_insufficient() {
        let mut chain = chain();
        let result = chain.transfer(TKN, ALICE, BOB, U256::from(101u64));
        assert!(matches!(result, Err(LedgerError::InsufficientBalance { .. })));
        assert_eq!(chain.balance_of(&TKN, &ALICE), U256::from(100u64));
    }

    #[test]
    fn test_transfer_saturating_clamps_source() {
        let mut chain = chain();
        let taken = chain
            .transfer_saturating(TKN, ALICE, BOB, U256::from(150u64))
            .unwrap();
        assert_eq!(taken, U256::from(100u64));
        assert_eq!(chain.balance_of(&TKN, &ALICE), U256::ZERO);
        assert_eq!(chain.balance_of(&TKN, &BOB), U256::from(150u64));
    }

    #[test]
    fn test_unknown_token() {
        let mut chain = SimulatedChain::new();
        assert_eq!(
            chain.mint(TKN, ALICE, U256::from(1u64)),
            Err(LedgerError::UnknownToken { token: TKN })
        );
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut chain = chain();
        chain.register(TKN, 18);
        assert_eq!(chain.decimals(&TKN), Some(6));
        assert_eq!(chain.balance_of(&TKN, &ALICE), U256::from(100u64));
    }
}
