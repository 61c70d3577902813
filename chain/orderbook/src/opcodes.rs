//! Orderbook opcodes appended after the standard table

use alloy_primitives::U256;
use interpreter::RuntimeError;
use types::ids::{word_to_address, OrderHash};
use types::opmeta::{Arity, OpMeta, OpMetaTable};
use types::ops::{standard_table, StandardOp};

use crate::orderbook::Orderbook;

pub const ORDER_FUNDS_CLEARED: u8 = StandardOp::COUNT as u8;
pub const COUNTERPARTY_FUNDS_CLEARED: u8 = StandardOp::COUNT as u8 + 1;

/// Context slot holding the evaluated order's hash.
pub const CONTEXT_ORDER_HASH: usize = 0;
/// Context slot holding the counterparty order owner.
pub const CONTEXT_COUNTERPARTY: usize = 1;

pub fn orderbook_entries() -> Vec<OpMeta> {
    vec![
        OpMeta::new("ORDER_FUNDS_CLEARED", Arity::Fixed(1), Arity::Fixed(1))
            .with_aliases(&["CLEARED"])
            .with_description("Total output an order has cleared"),
        OpMeta::new("COUNTERPARTY_FUNDS_CLEARED", Arity::Fixed(2), Arity::Fixed(1))
            .with_aliases(&["COUNTERPARTY_CLEARED"])
            .with_description("Output an order has cleared against one counterparty"),
    ]
}

/// Standard table plus the orderbook opcodes.
pub fn orderbook_table() -> OpMetaTable {
    match standard_table().extend(orderbook_entries()) {
        Ok(table) => table,
        Err(err) => unreachable!("orderbook opcode table is invalid: {err}"),
    }
}

fn pop(stack: &mut Vec<U256>, name: &str, needed: usize) -> Result<U256, RuntimeError> {
    stack.pop().ok_or_else(|| RuntimeError::StackUnderflow {
        name: name.to_string(),
        needed,
        available: 0,
    })
}

pub(crate) fn order_funds_cleared(
    stack: &mut Vec<U256>,
    _operand: u8,
    book: &Orderbook,
) -> Result<(), RuntimeError> {
    let key = pop(stack, "ORDER_FUNDS_CLEARED", 1)?;
    let cleared = book
        .order_cleared(&OrderHash::from_word(key))
        .ok_or(RuntimeError::MissingLedgerEntry { kind: "order", key })?;
    stack.push(cleared);
    Ok(())
}

pub(crate) fn counterparty_funds_cleared(
    stack: &mut Vec<U256>,
    _operand: u8,
    book: &Orderbook,
) -> Result<(), RuntimeError> {
    let counterparty = pop(stack, "COUNTERPARTY_FUNDS_CLEARED", 2)?;
    let key = pop(stack, "COUNTERPARTY_FUNDS_CLEARED", 2)?;
    let cleared = book
        .counterparty_cleared(&OrderHash::from_word(key), &word_to_address(counterparty))
        .ok_or(RuntimeError::MissingLedgerEntry { kind: "order", key })?;
    stack.push(cleared);
    Ok(())
}
