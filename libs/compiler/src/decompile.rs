//! Bytecode back to prefix call trees
//!
//! Each source is replayed against a stack of rendered expressions. The
//! output parses back to the same opcode/operand sequence.

use alloy_primitives::U256;
use types::bytecode::{decode, StateConfig};
use types::opmeta::OpMetaTable;

use crate::config::DEFAULT_PLACEHOLDER;
use crate::error::DecompileError;
use crate::operand::OperandRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Value,
    /// Extra output of the value below it.
    Continuation,
    /// Pushes nothing (e.g. DEBUG).
    Statement,
}

struct Rendered {
    text: String,
    slot: Slot,
}

fn literal_text(value: U256) -> String {
    if value == U256::MAX {
        "MaxUint256".to_string()
    } else {
        value.to_string()
    }
}

/// Render `config` as rule text. A single source is rendered bare, several
/// are each wrapped in braces.
pub fn decompile(config: &StateConfig, table: &OpMetaTable) -> Result<String, DecompileError> {
    let constant_opcode = table.index_of("CONSTANT");
    let mut rendered = Vec::with_capacity(config.sources.len());
    for (source_index, source) in config.sources.iter().enumerate() {
        rendered.push(decompile_source(config, table, constant_opcode, source_index, source)?);
    }
    Ok(match rendered.as_slice() {
        [single] => single.clone(),
        many => many
            .iter()
            .map(|body| format!("{{{body}}}"))
            .collect::<Vec<_>>()
            .join(" "),
    })
}

fn decompile_source(
    config: &StateConfig,
    table: &OpMetaTable,
    constant_opcode: Option<u8>,
    source_index: usize,
    source: &[u8],
) -> Result<String, DecompileError> {
    let mut stack: Vec<Rendered> = Vec::new();

    for instruction in decode(source) {
        if Some(instruction.opcode) == constant_opcode {
            let value = config
                .constants
                .get(usize::from(instruction.operand))
                .ok_or(DecompileError::ConstantOutOfRange {
                    source_index,
                    operand: instruction.operand,
                    constants: config.constants.len(),
                })?;
            stack.push(Rendered {
                text: literal_text(*value),
                slot: Slot::Value,
            });
            continue;
        }

        let meta = table.get(instruction.opcode).ok_or(DecompileError::UnknownOpcode {
            source_index,
            opcode: instruction.opcode,
        })?;
        let pops = meta.pops.eval(instruction.operand);
        let pushes = meta.pushes.eval(instruction.operand);

        let available = stack.iter().rev().take_while(|r| r.slot != Slot::Statement).count();
        if available < pops {
            return Err(DecompileError::StackUnderflow {
                source_index,
                name: meta.name.clone(),
                needed: pops,
                available,
            });
        }
        let args = stack.split_off(stack.len() - pops);
        if args.first().is_some_and(|first| first.slot == Slot::Continuation) {
            return Err(DecompileError::Unrepresentable {
                source_index,
                name: meta.name.clone(),
            });
        }

        let mut params: Vec<String> = OperandRule::for_name(&meta.name)
            .literal_params(instruction.operand)
            .into_iter()
            .map(|p| p.to_string())
            .collect();
        params.extend(args.into_iter().map(|a| a.text));
        let text = format!("{}({})", meta.name, params.join(", "));

        if pushes == 0 {
            stack.push(Rendered {
                text,
                slot: Slot::Statement,
            });
            continue;
        }
        stack.push(Rendered {
            text,
            slot: Slot::Value,
        });
        for _ in 1..pushes {
            stack.push(Rendered {
                text: DEFAULT_PLACEHOLDER.to_string(),
                slot: Slot::Continuation,
            });
        }
    }

    Ok(stack
        .into_iter()
        .map(|r| r.text)
        .collect::<Vec<_>>()
        .join(", "))
}
