//! Identifier types for orderbook entities
//!
//! Orders are identified by the keccak256 hash of their canonical encoding,
//! vaults by an arbitrary `U256` chosen by the owner.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a registered order.
///
/// Derived deterministically from the order contents, so registering the
/// same order twice yields the same hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderHash(B256);

impl OrderHash {
    /// Wrap an existing 32-byte hash.
    pub const fn new(hash: B256) -> Self {
        Self(hash)
    }

    /// Get the inner hash.
    pub fn as_b256(&self) -> &B256 {
        &self.0
    }

    /// The hash as a stack word, as it appears in interpreter context.
    pub fn to_word(&self) -> U256 {
        U256::from_be_slice(self.0.as_slice())
    }

    /// Recover a hash from a stack word.
    pub fn from_word(word: U256) -> Self {
        Self(B256::from(word.to_be_bytes::<32>()))
    }
}

impl fmt::Display for OrderHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<B256> for OrderHash {
    fn from(hash: B256) -> Self {
        Self(hash)
    }
}

/// Convert an address into a stack word (left-padded).
pub fn address_to_word(address: Address) -> U256 {
    U256::from_be_slice(address.as_slice())
}

/// Convert a stack word into an address (low 20 bytes).
pub fn word_to_address(word: U256) -> Address {
    Address::from_word(B256::from(word.to_be_bytes::<32>()))
}
