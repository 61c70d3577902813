//! Deterministic stack machine for compiled rules
//!
//! Runs one source of a [`StateConfig`](types::bytecode::StateConfig) and
//! returns the final stack. Standard opcodes are dispatched through
//! [`StandardOp`](types::ops::StandardOp); opcodes appended to the table by a
//! host are registered as [`DomainOp`]s.
//!
//! No I/O and no randomness: the same bytecode, context, timestamp and block
//! number always give the same stack.

pub mod config;
pub mod engine;
pub mod error;
pub mod host;
mod ops;
pub mod tier;

pub use config::InterpreterConfig;
pub use engine::{DomainOp, Interpreter, RunInput};
pub use error::RuntimeError;
pub use host::{ChainState, NullChain};
