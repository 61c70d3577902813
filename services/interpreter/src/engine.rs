//! Execution loop
//!
//! One run evaluates a single entrypoint source of a [`StateConfig`] against
//! a fresh stack. ZIPMAP re-enters the loop for a sub-source with a new frame
//! base, so `STACK(i)` always addresses the innermost frame.

use std::collections::HashMap;
use std::fmt;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::debug;
use types::bytecode::{decode, StateConfig};
use types::opmeta::{OpMeta, OpMetaTable};
use types::ops::StandardOp;

use crate::config::InterpreterConfig;
use crate::error::RuntimeError;
use crate::host::ChainState;
use crate::ops;

/// Implementation of an opcode appended after the standard table.
///
/// Receives the whole stack and must pop exactly `pops(operand)` words and
/// push exactly `pushes(operand)` words.
pub type DomainOp<H> = fn(&mut Vec<U256>, u8, &H) -> Result<(), RuntimeError>;

/// Values injected into a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInput {
    pub context: Vec<U256>,
    pub timestamp: Option<u64>,
    pub block_number: Option<u64>,
    pub sender: Address,
}

impl RunInput {
    pub fn new(context: Vec<U256>) -> Self {
        Self {
            context,
            ..Self::default()
        }
    }

    pub fn with_timestamp(mut self, timestamp: Option<u64>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_block_number(mut self, block_number: Option<u64>) -> Self {
        self.block_number = block_number;
        self
    }

    pub fn with_sender(mut self, sender: Address) -> Self {
        self.sender = sender;
        self
    }
}

pub struct Interpreter<H> {
    table: OpMetaTable,
    config: InterpreterConfig,
    storage: Vec<U256>,
    extensions: HashMap<u8, DomainOp<H>>,
}

impl<H> fmt::Debug for Interpreter<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut extensions: Vec<_> = self.extensions.keys().collect();
        extensions.sort();
        f.debug_struct("Interpreter")
            .field("opcodes", &self.table.len())
            .field("config", &self.config)
            .field("storage", &self.storage)
            .field("extensions", &extensions)
            .finish()
    }
}

/// Per-run state shared by every frame.
struct Run<'a, H> {
    state: &'a StateConfig,
    input: &'a RunInput,
    host: &'a H,
    stack: Vec<U256>,
}

impl<H: ChainState> Interpreter<H> {
    /// Build an interpreter over `table`, whose first entries must be the
    /// standard opcodes in order.
    pub fn new(table: OpMetaTable) -> Result<Self, RuntimeError> {
        Self::with_config(table, InterpreterConfig::default())
    }

    pub fn with_config(table: OpMetaTable, config: InterpreterConfig) -> Result<Self, RuntimeError> {
        table.check_prefix(&StandardOp::names())?;
        Ok(Self {
            table,
            config,
            storage: Vec::new(),
            extensions: HashMap::new(),
        })
    }

    /// Values read by STORAGE.
    pub fn with_storage(mut self, storage: Vec<U256>) -> Self {
        self.storage = storage;
        self
    }

    /// Register the implementation of a non-standard opcode.
    pub fn with_extension(mut self, opcode: u8, op: DomainOp<H>) -> Self {
        self.extensions.insert(opcode, op);
        self
    }

    pub fn table(&self) -> &OpMetaTable {
        &self.table
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Evaluate source `entrypoint` of `state` and return the final stack.
    pub fn run(
        &self,
        host: &H,
        state: &StateConfig,
        input: &RunInput,
        entrypoint: usize,
    ) -> Result<Vec<U256>, RuntimeError> {
        let mut run = Run {
            state,
            input,
            host,
            stack: Vec::with_capacity(32),
        };
        self.eval(&mut run, entrypoint, 0, 0)?;
        debug!(entrypoint, depth = run.stack.len(), "run finished");
        Ok(run.stack)
    }

    fn push(&self, run: &mut Run<'_, H>, value: U256) -> Result<(), RuntimeError> {
        if run.stack.len() >= self.config.max_stack_depth {
            return Err(RuntimeError::StackDepthExceeded {
                limit: self.config.max_stack_depth,
            });
        }
        run.stack.push(value);
        Ok(())
    }

    fn meta(&self, source_index: usize, offset: usize, opcode: u8) -> Result<&OpMeta, RuntimeError> {
        self.table.get(opcode).ok_or(RuntimeError::UnknownOpcode {
            source_index,
            offset,
            opcode,
        })
    }

    fn eval(
        &self,
        run: &mut Run<'_, H>,
        source_index: usize,
        base: usize,
        depth: usize,
    ) -> Result<(), RuntimeError> {
        if depth > self.config.max_call_depth {
            return Err(RuntimeError::CallDepthExceeded {
                limit: self.config.max_call_depth,
            });
        }
        let state = run.state;
        let source = state.sources.get(source_index).ok_or(RuntimeError::InvalidSource {
            index: source_index,
            count: state.sources.len(),
        })?;

        for (position, instruction) in decode(source).into_iter().enumerate() {
            let offset = position * 2;
            let operand = instruction.operand;
            let meta = self.meta(source_index, offset, instruction.opcode)?;
            let pops = meta.pops.eval(operand);
            let pushes = meta.pushes.eval(operand);

            let available = run.stack.len() - base;
            if available < pops {
                return Err(RuntimeError::StackUnderflow {
                    name: meta.name.clone(),
                    needed: pops,
                    available,
                });
            }

            let Some(op) = StandardOp::from_u8(instruction.opcode) else {
                let domain = self.extensions.get(&instruction.opcode).ok_or(RuntimeError::UnknownOpcode {
                    source_index,
                    offset,
                    opcode: instruction.opcode,
                })?;
                let before = run.stack.len();
                domain(&mut run.stack, operand, run.host)?;
                let expected = pushes as isize - pops as isize;
                let found = run.stack.len() as isize - before as isize;
                if found != expected {
                    return Err(RuntimeError::StackDiscipline {
                        name: meta.name.clone(),
                        expected,
                        found,
                    });
                }
                if run.stack.len() > self.config.max_stack_depth {
                    return Err(RuntimeError::StackDepthExceeded {
                        limit: self.config.max_stack_depth,
                    });
                }
                continue;
            };

            match op {
                StandardOp::Constant => {
                    let value = state.constants.get(usize::from(operand)).ok_or(
                        RuntimeError::ConstantOutOfRange {
                            index: operand,
                            len: state.constants.len(),
                        },
                    )?;
                    self.push(run, *value)?;
                }
                StandardOp::Stack => {
                    let value = run.stack.get(base + usize::from(operand)).copied().ok_or(
                        RuntimeError::StackOutOfRange {
                            index: operand,
                            len: available,
                        },
                    )?;
                    self.push(run, value)?;
                }
                StandardOp::Context => {
                    let value = run.input.context.get(usize::from(operand)).copied().ok_or(
                        RuntimeError::ContextOutOfRange {
                            index: operand,
                            len: run.input.context.len(),
                        },
                    )?;
                    self.push(run, value)?;
                }
                StandardOp::Storage => {
                    let value = self.storage.get(usize::from(operand)).copied().ok_or(
                        RuntimeError::StorageOutOfRange {
                            index: operand,
                            len: self.storage.len(),
                        },
                    )?;
                    self.push(run, value)?;
                }
                StandardOp::Debug => {
                    debug!(source_index, offset, stack = ?&run.stack[base..], "DEBUG");
                }
                StandardOp::Zipmap => self.zipmap(run, operand, pops, depth)?,
                _ => {
                    let args = run.stack.split_off(run.stack.len() - pops);
                    let results = ops::apply(op, operand, &args, run.input, &self.config, run.host)?;
                    if results.len() != pushes {
                        return Err(RuntimeError::StackDiscipline {
                            name: meta.name.clone(),
                            expected: pushes as isize - pops as isize,
                            found: results.len() as isize - pops as isize,
                        });
                    }
                    for value in results {
                        self.push(run, value)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Run a sub-source once per chunk of the popped values.
    ///
    /// Operand bits: `0..3` source index, `3..5` log2 of the chunk count,
    /// `5..8` value count minus one. Chunk `i` of every value is passed as
    /// `STACK(0..n)` of iteration `i`, lowest chunk first.
    fn zipmap(
        &self,
        run: &mut Run<'_, H>,
        operand: u8,
        pops: usize,
        depth: usize,
    ) -> Result<(), RuntimeError> {
        let source_index = usize::from(operand & 0b111);
        let iterations = 1usize << ((operand >> 3) & 0b11);
        let width = 256 / iterations;
        let mask = if width == 256 {
            U256::MAX
        } else {
            (U256::from(1u64) << width) - U256::from(1u64)
        };

        let values = run.stack.split_off(run.stack.len() - pops);
        for iteration in 0..iterations {
            let frame = run.stack.len();
            for value in &values {
                self.push(run, (*value >> (iteration * width)) & mask)?;
            }
            self.eval(run, source_index, frame, depth + 1)?;
            let found = (run.stack.len() - frame).saturating_sub(values.len());
            let result = match (found, run.stack.pop()) {
                (1, Some(result)) => result,
                _ => return Err(RuntimeError::ZipmapResult { found }),
            };
            run.stack.truncate(frame);
            run.stack.push(result);
        }
        Ok(())
    }
}
