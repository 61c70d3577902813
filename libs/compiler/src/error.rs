//! Compiler error taxonomy
//!
//! `CompileError` never escapes `parse`: it is stored on Error nodes and on
//! poisoned Op nodes. `BuildError` and `DecompileError` are ordinary results.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A malformed construct, carried inside the parse tree.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompileError {
    #[error("unknown opcode '{0}'")]
    UnknownOpcode(String),

    #[error("ambiguous expression/opcode '{0}'")]
    Ambiguous(String),

    #[error("arity mismatch: {name} expects {expected} parameters, found {found}")]
    ArityMismatch {
        name: String,
        expected: String,
        found: usize,
    },

    #[error("illegal placement of outputs: {name} needs {missing} placeholder(s) after it")]
    IllegalOutputPlacement { name: String, missing: usize },

    #[error("placeholder does not follow a multi-output opcode")]
    UnclaimedPlaceholder,

    #[error("{name} has no outputs and cannot be used as a parameter")]
    NoOutputs { name: String },

    #[error("parameter {index} of {name} must be a literal below {bound}")]
    InvalidOperand {
        name: String,
        index: usize,
        bound: u64,
    },

    #[error("arg() takes a single literal index below 256")]
    InvalidArg,

    #[error("invalid literal '{0}'")]
    InvalidLiteral(String),

    #[error("literal '{0}' does not fit in uint256")]
    LiteralOverflow(String),

    #[error("unknown symbol '{0}'")]
    UnknownSymbol(String),

    #[error("unexpected '{0}'")]
    UnexpectedToken(String),

    #[error("missing closing parenthesis")]
    MissingParen,

    #[error("parentheses nested deeper than {limit}")]
    NestingTooDeep { limit: usize },

    #[error("missing closing brace")]
    MissingBrace,

    #[error("empty expression")]
    EmptyExpression,

    #[error("missing operator between values")]
    MissingOperator,

    #[error("opcode {0} must abut its opening parenthesis")]
    DetachedParen(String),

    #[error("mixed operators require parentheses")]
    MixedOperators,

    #[error("malformed expression")]
    Malformed,
}

/// Reasons `try_build_bytes` refuses a tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("tree has {count} error(s), first: {first}")]
    Unbuildable { count: usize, first: CompileError },

    #[error("too many constants: {count} (at most 256)")]
    TooManyConstants { count: usize },

    #[error("arg({index}) relocated by {offset} exceeds the operand range")]
    ArgOutOfRange { index: u8, offset: u8 },

    #[error("opcode table has no {0} opcode")]
    MissingOpcode(&'static str),
}

/// Bytecode that cannot be rendered back to text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecompileError {
    #[error("source {source_index}: unknown opcode {opcode}")]
    UnknownOpcode { source_index: usize, opcode: u8 },

    #[error("source {source_index}: constant {operand} out of range ({constants} defined)")]
    ConstantOutOfRange {
        source_index: usize,
        operand: u8,
        constants: usize,
    },

    #[error("source {source_index}: {name} needs {needed} value(s), {available} available")]
    StackUnderflow {
        source_index: usize,
        name: String,
        needed: usize,
        available: usize,
    },

    #[error("source {source_index}: {name} consumes a statement with no value")]
    Unrepresentable { source_index: usize, name: String },
}
