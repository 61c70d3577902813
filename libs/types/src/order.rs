//! Order types
//!
//! An order names the vaults it receives into (`inputs`) and pays out of
//! (`outputs`), and carries the compiled rule that prices it.

use alloy_primitives::{keccak256, Address, U256};
use serde::{Deserialize, Serialize};

use crate::bytecode::StateConfig;
use crate::ids::{address_to_word, OrderHash};

/// A `(token, vault_id)` pair an order reads from or writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Io {
    pub token: Address,
    pub vault_id: U256,
}

impl Io {
    pub fn new(token: Address, vault_id: U256) -> Self {
        Self { token, vault_id }
    }
}

/// A limit order priced by a compiled rule.
///
/// Source 0 of `config` is the pricing entrypoint: its last two results are
/// `(max_output, price)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub owner: Address,
    pub inputs: Vec<Io>,
    pub outputs: Vec<Io>,
    pub config: StateConfig,
}

impl Order {
    pub fn new(owner: Address, inputs: Vec<Io>, outputs: Vec<Io>, config: StateConfig) -> Self {
        Self {
            owner,
            inputs,
            outputs,
            config,
        }
    }

    /// Order with a single input and a single output vault.
    pub fn single(owner: Address, input: Io, output: Io, config: StateConfig) -> Self {
        Self::new(owner, vec![input], vec![output], config)
    }

    /// Deterministic hash of the canonical encoding.
    pub fn hash(&self) -> OrderHash {
        OrderHash::new(keccak256(self.encode()))
    }

    /// Canonical encoding: 32-byte big-endian words, lists prefixed by
    /// their length, source bytes prefixed by their byte length.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        push_word(&mut out, address_to_word(self.owner));
        for ios in [&self.inputs, &self.outputs] {
            push_word(&mut out, U256::from(ios.len()));
            for io in ios.iter() {
                push_word(&mut out, address_to_word(io.token));
                push_word(&mut out, io.vault_id);
            }
        }
        push_word(&mut out, U256::from(self.config.sources.len()));
        for source in &self.config.sources {
            push_word(&mut out, U256::from(source.len()));
            out.extend_from_slice(source);
        }
        push_word(&mut out, U256::from(self.config.constants.len()));
        for constant in &self.config.constants {
            push_word(&mut out, *constant);
        }
        out
    }
}

fn push_word(out: &mut Vec<u8>, word: U256) {
    out.extend_from_slice(&word.to_be_bytes::<32>());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Instruction;

    fn sample(vault: u64) -> Order {
        Order::single(
            Address::repeat_byte(1),
            Io::new(Address::repeat_byte(2), U256::from(vault)),
            Io::new(Address::repeat_byte(3), U256::from(vault)),
            StateConfig::from_instructions(
                vec![vec![Instruction::new(0, 0), Instruction::new(0, 1)]],
                vec![U256::from(10u64), U256::from(20u64)],
            ),
        )
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(sample(1).hash(), sample(1).hash());
    }

    #[test]
    fn test_hash_depends_on_contents() {
        assert_ne!(sample(1).hash(), sample(2).hash());

        let mut swapped = sample(1);
        std::mem::swap(&mut swapped.inputs, &mut swapped.outputs);
        assert_ne!(swapped.hash(), sample(1).hash());
    }

    #[test]
    fn test_encoding_length() {
        let order = sample(1);
        // owner, two lists of one io, one source of 4 bytes, two constants
        assert_eq!(order.encode().len(), 32 * 12 + 4);
    }

    #[test]
    fn test_order_serialization() {
        let order = sample(7);
        let json = serde_json::to_string(&order).unwrap();
        let deserialized: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, deserialized);
        assert_eq!(order.hash(), deserialized.hash());
    }
}
