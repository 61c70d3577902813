//! Ledger error types
//!
//! Fatal ledger failures. A clear that cannot settle is not an error; it is
//! reported as [`ClearOutcome::NoOp`](crate::clear::ClearOutcome::NoOp).

use alloy_primitives::{Address, U256};
use interpreter::RuntimeError;
use thiserror::Error;
use types::errors::NumericError;
use types::ids::OrderHash;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Token not registered: {token}")]
    UnknownToken { token: Address },

    #[error("Insufficient {token} balance for {account}: required {required}, available {available}")]
    InsufficientBalance {
        token: Address,
        account: Address,
        required: U256,
        available: U256,
    },

    #[error("Vault not found: owner {owner}, token {token}, id {vault_id}")]
    VaultNotFound {
        owner: Address,
        token: Address,
        vault_id: U256,
    },

    #[error("Order not found: {0}")]
    UnknownOrder(OrderHash),

    #[error("Unauthorized: {sender} does not own order {order}")]
    NotOwner { sender: Address, order: OrderHash },

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("IO index {index} out of range for order {order} ({len} entries)")]
    IoOutOfRange {
        order: OrderHash,
        index: usize,
        len: usize,
    },

    #[error("Token mismatch: {output} output cannot fill {input} input")]
    TokenMismatch { output: Address, input: Address },

    #[error("Orders {0} and {1} share an owner")]
    SameOwner(OrderHash, OrderHash),

    #[error("Order {order} left {found} values; expected (max output, price)")]
    MissingResults { order: OrderHash, found: usize },

    #[error("Arithmetic overflow in balance calculation")]
    Overflow,

    #[error("Numeric error: {0}")]
    Numeric(#[from] NumericError),

    #[error("Rule evaluation failed: {0}")]
    Runtime(#[from] RuntimeError),
}
