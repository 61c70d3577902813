//! Error types shared across the simulator
//!
//! Error taxonomy using thiserror

use thiserror::Error;

/// Fixed-point arithmetic errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumericError {
    #[error("Arithmetic overflow in fixed-point calculation")]
    Overflow,

    #[error("Division by zero in fixed-point calculation")]
    DivisionByZero,

    #[error("Negative amount not representable: {0}")]
    Negative(String),

    #[error("Invalid decimal literal: {0}")]
    InvalidDecimal(String),
}

/// OpMeta table load-time validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OpMetaError {
    #[error("Opcode table is empty")]
    Empty,

    #[error("Opcode table has {count} entries, at most 256 are addressable")]
    TooManyOpcodes { count: usize },

    #[error("Opcode {index} has an empty name")]
    EmptyName { index: usize },

    #[error("Word '{word}' is claimed by opcode {first} and opcode {second}")]
    DuplicateWord {
        word: String,
        first: usize,
        second: usize,
    },

    #[error("Opcode {index} is '{found}', expected standard opcode '{expected}'")]
    StandardOrder {
        index: usize,
        expected: String,
        found: String,
    },
}

/// Bytecode config validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Source {source_index} has odd length {length}")]
    OddSourceLength { source_index: usize, length: usize },

    #[error("Source {source_index} references unknown opcode {opcode} at byte {offset}")]
    UnknownOpcode {
        source_index: usize,
        opcode: u8,
        offset: usize,
    },

    #[error("Source {source_index} references constant {operand}, only {constants} defined")]
    ConstantOutOfRange {
        source_index: usize,
        operand: u8,
        constants: usize,
    },

    #[error("Too many constants: {count} (at most 256)")]
    TooManyConstants { count: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_error_display() {
        let err = NumericError::InvalidDecimal("1.2.3".to_string());
        assert_eq!(err.to_string(), "Invalid decimal literal: 1.2.3");
    }

    #[test]
    fn test_opmeta_error_display() {
        let err = OpMetaError::DuplicateWord {
            word: "ADD".to_string(),
            first: 33,
            second: 46,
        };
        assert!(err.to_string().contains("ADD"));
        assert!(err.to_string().contains("46"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::ConstantOutOfRange {
            source_index: 0,
            operand: 3,
            constants: 2,
        };
        assert!(err.to_string().contains("constant 3"));
    }
}
