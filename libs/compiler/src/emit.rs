//! Bytecode emission
//!
//! Post-order walk of each source: params first, then the op itself.
//! Literals are pooled by value across the whole unit.

use std::collections::HashMap;

use alloy_primitives::{Bytes, U256};
use tracing::warn;
use types::bytecode::StateConfig;

use crate::error::{BuildError, CompileError};
use crate::tree::{NodeId, NodeKind, ParseTree, ValueKind};

struct Emitter<'a> {
    tree: &'a ParseTree,
    arg_offset: u8,
    constants: Vec<U256>,
    pool: HashMap<U256, u8>,
}

impl<'a> Emitter<'a> {
    fn constant(&mut self, value: U256) -> Result<u8, BuildError> {
        if let Some(index) = self.pool.get(&value) {
            return Ok(*index);
        }
        let index = u8::try_from(self.constants.len()).map_err(|_| BuildError::TooManyConstants {
            count: self.constants.len() + 1,
        })?;
        self.constants.push(value);
        self.pool.insert(value, index);
        Ok(index)
    }

    fn emit(&mut self, id: NodeId, out: &mut Vec<u8>) -> Result<(), BuildError> {
        let tree = self.tree;
        match &tree.node(id).kind {
            NodeKind::Value(value) => match value.kind {
                ValueKind::Literal(literal) => {
                    let opcode = tree.constant_opcode.ok_or(BuildError::MissingOpcode("CONSTANT"))?;
                    let index = self.constant(literal)?;
                    out.extend([opcode, index]);
                }
                ValueKind::MaxUint256 => {
                    let opcode = tree.constant_opcode.ok_or(BuildError::MissingOpcode("CONSTANT"))?;
                    let index = self.constant(U256::MAX)?;
                    out.extend([opcode, index]);
                }
                ValueKind::Arg(index) => {
                    let opcode = tree.stack_opcode.ok_or(BuildError::MissingOpcode("STACK"))?;
                    let operand = index.checked_add(self.arg_offset).ok_or(BuildError::ArgOutOfRange {
                        index,
                        offset: self.arg_offset,
                    })?;
                    out.extend([opcode, operand]);
                }
                ValueKind::Output { .. } => {}
                ValueKind::Placeholder => {
                    return Err(BuildError::Unbuildable {
                        count: 1,
                        first: CompileError::UnclaimedPlaceholder,
                    })
                }
            },
            NodeKind::Op(op) => {
                for param in op.params.iter().skip(op.consumed) {
                    self.emit(*param, out)?;
                }
                let operand = op.operand.ok_or_else(|| BuildError::Unbuildable {
                    count: 1,
                    first: op.error.clone().unwrap_or(CompileError::Malformed),
                })?;
                out.extend([op.opcode, operand]);
            }
            NodeKind::Error(error) => {
                return Err(BuildError::Unbuildable {
                    count: 1,
                    first: error.error.clone(),
                })
            }
        }
        Ok(())
    }
}

/// Emit bytecode, relocating every `arg(i)` to `STACK(arg_offset + i)`.
pub fn try_build_bytes(tree: &ParseTree, arg_offset: u8) -> Result<StateConfig, BuildError> {
    let errors = tree.errors();
    if let Some((first, _)) = errors.first() {
        return Err(BuildError::Unbuildable {
            count: errors.len(),
            first: (*first).clone(),
        });
    }

    let mut emitter = Emitter {
        tree,
        arg_offset,
        constants: Vec::new(),
        pool: HashMap::new(),
    };
    let mut sources: Vec<Bytes> = Vec::with_capacity(tree.sources().len());
    for source in tree.sources() {
        let mut out = Vec::new();
        for id in source {
            emitter.emit(*id, &mut out)?;
        }
        sources.push(out.into());
    }
    Ok(StateConfig::new(sources, emitter.constants))
}

/// Emit bytecode, or an empty config if the tree is not buildable.
pub fn build_bytes(tree: &ParseTree) -> StateConfig {
    build_bytes_with_arg_offset(tree, 0)
}

pub fn build_bytes_with_arg_offset(tree: &ParseTree, arg_offset: u8) -> StateConfig {
    match try_build_bytes(tree, arg_offset) {
        Ok(config) => config,
        Err(error) => {
            warn!(%error, "refusing to emit bytecode");
            StateConfig::default()
        }
    }
}
