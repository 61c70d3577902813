//! Orderbook events
//!
//! Immutable records appended by every state-changing ledger operation.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use types::ids::OrderHash;
use types::order::Order;

use crate::clear::{BountyConfig, ClearStateChange};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOrder {
    pub sender: Address,
    pub order_hash: OrderHash,
    pub order: Order,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveOrder {
    pub sender: Address,
    pub order_hash: OrderHash,
}

/// `amount` is the 18-decimal vault credit, `units` the native token units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub sender: Address,
    pub token: Address,
    pub vault_id: U256,
    pub units: U256,
    pub amount: U256,
}

/// `amount` is what actually left the vault; it is below `requested` when
/// the vault held less.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdraw {
    pub sender: Address,
    pub token: Address,
    pub vault_id: U256,
    pub requested: U256,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clear {
    pub sender: Address,
    pub a: OrderHash,
    pub b: OrderHash,
    pub bounty: BountyConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AfterClear {
    pub change: ClearStateChange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderbookEvent {
    AddOrder(AddOrder),
    RemoveOrder(RemoveOrder),
    Deposit(Deposit),
    Withdraw(Withdraw),
    Clear(Clear),
    AfterClear(AfterClear),
}
