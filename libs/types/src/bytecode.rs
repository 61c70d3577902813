//! Compiled bytecode config
//!
//! A `StateConfig` is what the compiler produces and the interpreter
//! consumes: a list of sources, each a flat run of `(opcode, operand)` byte
//! pairs, plus a constant pool shared by all sources.

use alloy_primitives::{Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::opmeta::OpMetaTable;
use crate::ops::StandardOp;

/// A single decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: u8,
    pub operand: u8,
}

impl Instruction {
    pub const fn new(opcode: u8, operand: u8) -> Self {
        Self { opcode, operand }
    }
}

/// Compiled sources and constants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateConfig {
    pub sources: Vec<Bytes>,
    pub constants: Vec<U256>,
}

impl StateConfig {
    pub fn new(sources: Vec<Bytes>, constants: Vec<U256>) -> Self {
        Self { sources, constants }
    }

    /// Build a config from decoded instructions.
    pub fn from_instructions(sources: Vec<Vec<Instruction>>, constants: Vec<U256>) -> Self {
        let sources = sources
            .into_iter()
            .map(|ops| {
                ops.into_iter()
                    .flat_map(|op| [op.opcode, op.operand])
                    .collect::<Vec<u8>>()
                    .into()
            })
            .collect();
        Self { sources, constants }
    }

    /// `true` for the empty config returned by a refused build.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.constants.is_empty()
    }

    /// Decode one source into instructions. A trailing odd byte is ignored.
    pub fn instructions(&self, source_index: usize) -> Option<Vec<Instruction>> {
        self.sources.get(source_index).map(|source| decode(source))
    }

    /// Check the config invariants against an opcode table.
    ///
    /// Every opcode must resolve in `table` and every CONSTANT operand must
    /// address the constant pool.
    pub fn validate(&self, table: &OpMetaTable) -> Result<(), ConfigError> {
        if self.constants.len() > 256 {
            return Err(ConfigError::TooManyConstants {
                count: self.constants.len(),
            });
        }
        for (source_index, source) in self.sources.iter().enumerate() {
            if source.len() % 2 != 0 {
                return Err(ConfigError::OddSourceLength {
                    source_index,
                    length: source.len(),
                });
            }
            for (i, op) in decode(source).into_iter().enumerate() {
                if table.get(op.opcode).is_none() {
                    return Err(ConfigError::UnknownOpcode {
                        source_index,
                        opcode: op.opcode,
                        offset: i * 2,
                    });
                }
                if op.opcode == StandardOp::Constant as u8
                    && usize::from(op.operand) >= self.constants.len()
                {
                    return Err(ConfigError::ConstantOutOfRange {
                        source_index,
                        operand: op.operand,
                        constants: self.constants.len(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Decode a raw source into instruction pairs.
pub fn decode(source: &[u8]) -> Vec<Instruction> {
    source
        .chunks_exact(2)
        .map(|pair| Instruction::new(pair[0], pair[1]))
        .collect()
}
