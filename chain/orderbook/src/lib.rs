//! Simulated Orderbook Ledger
//!
//! Off-chain model of a rule-priced limit orderbook: simulated ERC-20
//! balances, per-owner vaults, an order registry, cleared-funds totals and
//! bilateral clear settlement driven by the interpreter.
//!
//! # Modules
//! - `token`: Simulated ERC-20 table in native decimals
//! - `vault`: 18-decimal vault balances
//! - `clear`: Clear arithmetic and outcomes
//! - `opcodes`: Orderbook opcodes appended to the standard table
//! - `orderbook`: Registry, deposits, withdrawals and `clear`
//! - `events`: Append-only event records
//! - `errors`: Ledger error types

pub mod clear;
pub mod config;
pub mod errors;
pub mod events;
pub mod opcodes;
pub mod orderbook;
pub mod token;
pub mod vault;

pub use clear::{BountyConfig, ClearOutcome, ClearStateChange, OrderEval};
pub use config::OrderbookConfig;
pub use errors::LedgerError;
pub use opcodes::orderbook_table;
pub use orderbook::Orderbook;
