//! Runtime errors
//!
//! Every variant aborts the current run. Nothing here is recovered inside
//! the interpreter; callers decide what a failed evaluation means.

use alloy_primitives::U256;
use thiserror::Error;
use types::errors::{NumericError, OpMetaError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("unknown opcode {opcode} at byte {offset} of source {source_index}")]
    UnknownOpcode {
        source_index: usize,
        offset: usize,
        opcode: u8,
    },

    #[error("stack underflow in {name}: needs {needed}, frame holds {available}")]
    StackUnderflow {
        name: String,
        needed: usize,
        available: usize,
    },

    #[error("context index {index} out of range (len {len})")]
    ContextOutOfRange { index: u8, len: usize },

    #[error("stack index {index} out of range (frame len {len})")]
    StackOutOfRange { index: u8, len: usize },

    #[error("storage index {index} out of range (len {len})")]
    StorageOutOfRange { index: u8, len: usize },

    #[error("constant index {index} out of range (len {len})")]
    ConstantOutOfRange { index: u8, len: usize },

    #[error("source {index} does not exist ({count} sources)")]
    InvalidSource { index: usize, count: usize },

    #[error("arithmetic overflow in {0}")]
    Overflow(String),

    #[error("division by zero in {0}")]
    DivisionByZero(String),

    #[error("stack depth limit {limit} exceeded")]
    StackDepthExceeded { limit: usize },

    #[error("call depth limit {limit} exceeded")]
    CallDepthExceeded { limit: usize },

    #[error("zipmap iteration left {found} values instead of 1")]
    ZipmapResult { found: usize },

    #[error("{name} moved the stack by {found} instead of {expected}")]
    StackDiscipline {
        name: String,
        expected: isize,
        found: isize,
    },

    #[error("no ledger entry for {kind} {key:#x}")]
    MissingLedgerEntry { kind: &'static str, key: U256 },

    #[error("value {value} does not fit in {what}")]
    OutOfBounds { what: &'static str, value: U256 },

    #[error("host does not support {0}")]
    Unsupported(&'static str),

    #[error("opcode table rejected: {0}")]
    Table(#[from] OpMetaError),
}

impl RuntimeError {
    pub(crate) fn numeric(name: &str, error: NumericError) -> Self {
        match error {
            NumericError::DivisionByZero => RuntimeError::DivisionByZero(name.to_string()),
            _ => RuntimeError::Overflow(name.to_string()),
        }
    }
}
