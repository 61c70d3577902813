//! Orderbook configuration

use alloy_primitives::Address;
use interpreter::InterpreterConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderbookConfig {
    /// Account holding deposited tokens; also what THIS_ADDRESS and SENDER
    /// report inside order rules.
    pub address: Address,
    pub interpreter: InterpreterConfig,
}

impl OrderbookConfig {
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }
}
