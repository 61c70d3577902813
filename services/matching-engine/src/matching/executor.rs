//! Clear execution logic
//!
//! Runs one candidate pair through the orderbook and records the outcome.

use alloy_primitives::Address;
use orderbook::{BountyConfig, LedgerError, Orderbook};
use tracing::{debug, info};
use types::order::Order;

use crate::events::MatchRecord;
use crate::matching::crossing::IoPairing;

/// Match executor for handling clear attempts
#[derive(Debug, Clone, Default)]
pub struct MatchExecutor {
    sequence_counter: u64,
}

/// Time of a matching pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearTime {
    pub timestamp: Option<u64>,
    pub block_number: Option<u64>,
}

impl MatchExecutor {
    /// Create a new match executor with starting sequence number
    pub fn new(starting_sequence: u64) -> Self {
        Self {
            sequence_counter: starting_sequence,
        }
    }

    /// Get next sequence number (monotonically increasing)
    fn next_sequence(&mut self) -> u64 {
        let seq = self.sequence_counter;
        self.sequence_counter += 1;
        seq
    }

    /// Clear `a` against `b` over `pairing`, bounties to `sender`.
    ///
    /// A clear that no-ops is still recorded; only ledger-fatal errors
    /// abort.
    #[allow(clippy::too_many_arguments)]
    pub fn execute_clear(
        &mut self,
        book: &mut Orderbook,
        sender: Address,
        a: &Order,
        b: &Order,
        pairing: IoPairing,
        bounty: BountyConfig,
        time: ClearTime,
    ) -> Result<MatchRecord, LedgerError> {
        let bounty = bounty.with_io(
            pairing.a_input,
            pairing.a_output,
            pairing.b_input,
            pairing.b_output,
        );
        let outcome = book.clear(sender, a, b, bounty, time.timestamp, time.block_number)?;
        let sequence = self.next_sequence();
        let record = MatchRecord {
            sequence,
            a: a.hash(),
            b: b.hash(),
            bounty,
            outcome,
        };
        if record.is_settled() {
            info!(sequence, a = %record.a, b = %record.b, "match settled");
        } else {
            debug!(sequence, a = %record.a, b = %record.b, "match attempted without effect");
        }
        Ok(record)
    }
}
