//! Match records
//!
//! One record per attempted clear, whatever its outcome.

use orderbook::{BountyConfig, ClearOutcome};
use serde::{Deserialize, Serialize};
use types::ids::OrderHash;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Monotonic across every `make_match` call of one matchmaker.
    pub sequence: u64,
    /// Giving side: its output vault was funded when the pair was found.
    pub a: OrderHash,
    pub b: OrderHash,
    pub bounty: BountyConfig,
    pub outcome: ClearOutcome,
}

impl MatchRecord {
    pub fn is_settled(&self) -> bool {
        self.outcome.is_settled()
    }
}
