//! Types library for the rule-language orderbook simulator
//!
//! Core definitions shared by the compiler, interpreter, orderbook and
//! matcher, so that all four agree on opcode identities and bytecode layout.
//!
//! # Modules
//! - `ids`: Order hashes and address/word conversions
//! - `numeric`: 18-decimal fixed-point helpers over `U256`
//! - `opmeta`: Opcode metadata and the validated opcode table
//! - `ops`: The standard opcode set
//! - `bytecode`: Compiled `StateConfig` and instruction decoding
//! - `order`: Orders and their input/output vaults
//! - `errors`: Error taxonomy

pub mod bytecode;
pub mod errors;
pub mod ids;
pub mod numeric;
pub mod opmeta;
pub mod ops;
pub mod order;

pub use alloy_primitives::{Address, Bytes, B256, U256};

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bytecode::*;
    pub use crate::errors::*;
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::opmeta::*;
    pub use crate::ops::*;
    pub use crate::order::*;
    pub use alloy_primitives::{Address, Bytes, B256, U256};
}
