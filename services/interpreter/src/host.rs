//! Chain state seen by token and tier opcodes
//!
//! The interpreter never touches balances itself. Token queries go through
//! [`ChainState`]; a host answers the ones it simulates and leaves the rest
//! at their default, which fails the run with [`RuntimeError::Unsupported`].

use alloy_primitives::{Address, U256};

use crate::error::RuntimeError;

pub trait ChainState {
    fn erc20_balance_of(&self, _token: Address, _account: Address) -> Result<U256, RuntimeError> {
        Err(RuntimeError::Unsupported("IERC20_BALANCE_OF"))
    }

    fn erc20_total_supply(&self, _token: Address) -> Result<U256, RuntimeError> {
        Err(RuntimeError::Unsupported("IERC20_TOTAL_SUPPLY"))
    }

    fn erc20_snapshot_balance_of_at(
        &self,
        _token: Address,
        _account: Address,
        _snapshot_id: U256,
    ) -> Result<U256, RuntimeError> {
        Err(RuntimeError::Unsupported("IERC20_SNAPSHOT_BALANCE_OF_AT"))
    }

    fn erc20_snapshot_total_supply_at(
        &self,
        _token: Address,
        _snapshot_id: U256,
    ) -> Result<U256, RuntimeError> {
        Err(RuntimeError::Unsupported("IERC20_SNAPSHOT_TOTAL_SUPPLY_AT"))
    }

    fn erc721_balance_of(&self, _token: Address, _account: Address) -> Result<U256, RuntimeError> {
        Err(RuntimeError::Unsupported("IERC721_BALANCE_OF"))
    }

    fn erc721_owner_of(&self, _token: Address, _id: U256) -> Result<Address, RuntimeError> {
        Err(RuntimeError::Unsupported("IERC721_OWNER_OF"))
    }

    fn erc1155_balance_of(
        &self,
        _token: Address,
        _account: Address,
        _id: U256,
    ) -> Result<U256, RuntimeError> {
        Err(RuntimeError::Unsupported("IERC1155_BALANCE_OF"))
    }

    /// Defaults to one [`ChainState::erc1155_balance_of`] per pair.
    fn erc1155_balance_of_batch(
        &self,
        token: Address,
        accounts: &[Address],
        ids: &[U256],
    ) -> Result<Vec<U256>, RuntimeError> {
        accounts
            .iter()
            .zip(ids)
            .map(|(account, id)| self.erc1155_balance_of(token, *account, *id))
            .collect()
    }

    /// Packed tier report of `account` as reported by `contract`.
    fn tier_report(
        &self,
        _contract: Address,
        _account: Address,
        _context: &[U256],
    ) -> Result<U256, RuntimeError> {
        Err(RuntimeError::Unsupported("ITIERV2_REPORT"))
    }

    fn tier_report_time_for_tier(
        &self,
        _contract: Address,
        _account: Address,
        _tier: U256,
        _context: &[U256],
    ) -> Result<U256, RuntimeError> {
        Err(RuntimeError::Unsupported("ITIERV2_REPORT_TIME_FOR_TIER"))
    }
}

/// A host with no chain behind it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullChain;

impl ChainState for NullChain {}
