//! Operand encoding rules
//!
//! Most opcodes derive their operand from the parameter count. A handful
//! fold leading literal parameters into the operand byte instead; those
//! parameters never reach the stack, and the decompiler expands them back.

use alloy_primitives::U256;
use types::opmeta::{normalize, OpMeta};

use crate::error::CompileError;
use crate::tree::{NodeId, ParseTree};

/// How an opcode's operand is derived from its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandRule {
    /// One literal operand param followed by `stack` stack params.
    Literal { stack: usize },
    Zipmap,
    SelectLte,
    UpdateTimes,
    BalanceOfBatch,
    TierReport {
        prefix: usize,
        allowed: &'static [usize],
    },
    /// Operand is the param count for variadic ops, zero otherwise.
    Count,
}

/// A resolved operand and how many leading params it consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub operand: u8,
    pub consumed: usize,
}

impl OperandRule {
    pub fn for_name(name: &str) -> Self {
        match normalize(name).as_str() {
            "STACK" | "CONTEXT" | "STORAGE" => OperandRule::Literal { stack: 0 },
            "SCALE18" | "SCALEN" | "SCALE_BY" => OperandRule::Literal { stack: 1 },
            "SCALE18_MUL" | "SCALE18_DIV" => OperandRule::Literal { stack: 2 },
            "ZIPMAP" => OperandRule::Zipmap,
            "SELECT_LTE" => OperandRule::SelectLte,
            "UPDATE_TIMES_FOR_TIER_RANGE" => OperandRule::UpdateTimes,
            "IERC1155_BALANCE_OF_BATCH" => OperandRule::BalanceOfBatch,
            "ITIERV2_REPORT" => OperandRule::TierReport {
                prefix: 2,
                allowed: &[2, 3, 10],
            },
            "ITIERV2_REPORT_TIME_FOR_TIER" => OperandRule::TierReport {
                prefix: 3,
                allowed: &[3, 4, 11],
            },
            _ => OperandRule::Count,
        }
    }

    /// Resolve the operand of an op with the given params.
    pub fn resolve(
        &self,
        tree: &ParseTree,
        meta: &OpMeta,
        params: &[NodeId],
    ) -> Result<Resolved, CompileError> {
        let n = params.len();
        let mismatch = |expected: String| CompileError::ArityMismatch {
            name: meta.name.clone(),
            expected,
            found: n,
        };
        let literal = |index: usize, bound: u64| -> Result<u8, CompileError> {
            tree.literal(params[index])
                .filter(|value| *value < U256::from(bound))
                .and_then(|value| u8::try_from(value).ok())
                .ok_or_else(|| CompileError::InvalidOperand {
                    name: meta.name.clone(),
                    index,
                    bound,
                })
        };

        match *self {
            OperandRule::Literal { stack } => {
                if n != stack + 1 {
                    return Err(mismatch((stack + 1).to_string()));
                }
                Ok(Resolved {
                    operand: literal(0, 256)?,
                    consumed: 1,
                })
            }
            OperandRule::Zipmap => {
                if !(3..=10).contains(&n) {
                    return Err(mismatch("3 to 10".to_string()));
                }
                let source = literal(0, 8)?;
                let loop_size = literal(1, 4)?;
                // bits 5..8 hold the value count minus one; the values are
                // the `n - 2` params after source and loop size
                Ok(Resolved {
                    operand: source | loop_size << 3 | ((n - 3) as u8) << 5,
                    consumed: 2,
                })
            }
            OperandRule::SelectLte => {
                if !(5..=34).contains(&n) {
                    return Err(mismatch("5 to 34".to_string()));
                }
                let logic = literal(0, 2)?;
                let mode = literal(1, 3)?;
                // bits 3..8 hold the report count, leaving out the trailing
                // reference time
                Ok(Resolved {
                    operand: logic | mode << 1 | ((n - 3) as u8) << 3,
                    consumed: 2,
                })
            }
            OperandRule::UpdateTimes => {
                if n != 4 {
                    return Err(mismatch("4".to_string()));
                }
                let start = literal(0, 9)?;
                let end = literal(1, 9)?;
                Ok(Resolved {
                    operand: start | end << 4,
                    consumed: 2,
                })
            }
            OperandRule::BalanceOfBatch => {
                if n < 3 || n % 2 == 0 || n > 511 {
                    return Err(mismatch("an odd count from 3 to 511".to_string()));
                }
                Ok(Resolved {
                    operand: ((n - 1) / 2) as u8,
                    consumed: 0,
                })
            }
            OperandRule::TierReport { prefix, allowed } => {
                if !allowed.contains(&n) {
                    let expected: Vec<String> = allowed.iter().map(|a| a.to_string()).collect();
                    return Err(mismatch(format!("one of {}", expected.join(", "))));
                }
                Ok(Resolved {
                    operand: (n - prefix) as u8,
                    consumed: 0,
                })
            }
            OperandRule::Count if meta.pops.is_variadic() => {
                if n == 0 || n > 255 {
                    return Err(mismatch("1 to 255".to_string()));
                }
                Ok(Resolved {
                    operand: n as u8,
                    consumed: 0,
                })
            }
            OperandRule::Count => {
                let expected = meta.pops.eval(0);
                if n != expected {
                    return Err(mismatch(expected.to_string()));
                }
                Ok(Resolved {
                    operand: 0,
                    consumed: 0,
                })
            }
        }
    }

    /// Literal params folded into `operand`, in source order.
    pub fn literal_params(&self, operand: u8) -> Vec<u8> {
        match self {
            OperandRule::Literal { .. } => vec![operand],
            OperandRule::Zipmap => vec![operand & 0b111, (operand >> 3) & 0b11],
            OperandRule::SelectLte => vec![operand & 1, (operand >> 1) & 0b11],
            OperandRule::UpdateTimes => vec![operand & 0xF, operand >> 4],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_lookup_is_normalized() {
        assert_eq!(OperandRule::for_name("zipmap"), OperandRule::Zipmap);
        assert_eq!(
            OperandRule::for_name("scale18-mul"),
            OperandRule::Literal { stack: 2 }
        );
        assert_eq!(OperandRule::for_name("ADD"), OperandRule::Count);
    }

    #[test]
    fn test_literal_params_unpack() {
        let zipmap = 5 | 2 << 3 | 4 << 5;
        assert_eq!(OperandRule::Zipmap.literal_params(zipmap), vec![5, 2]);
        let select = 1 | 2 << 1 | 7 << 3;
        assert_eq!(OperandRule::SelectLte.literal_params(select), vec![1, 2]);
        assert_eq!(OperandRule::UpdateTimes.literal_params(3 | 8 << 4), vec![3, 8]);
        assert_eq!(OperandRule::Literal { stack: 0 }.literal_params(9), vec![9]);
        assert!(OperandRule::Count.literal_params(4).is_empty());
    }
}
