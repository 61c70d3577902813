//! Interpreter configuration

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Maximum number of words on the stack at any point of a run.
    pub max_stack_depth: usize,
    /// Maximum ZIPMAP nesting.
    pub max_call_depth: usize,
    /// Value pushed by THIS_ADDRESS.
    pub address: Address,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_stack_depth: 1024,
            max_call_depth: 16,
            address: Address::ZERO,
        }
    }
}

impl InterpreterConfig {
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }
}
