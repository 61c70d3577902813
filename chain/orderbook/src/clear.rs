//! Bilateral clear arithmetic
//!
//! Given each side's evaluated `(max_output, price)`, work out how much each
//! order gives, how much each receives, and what is left for the clearer.
//! Prices are 18-decimal ratios of input per unit of output.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use types::numeric::fp_mul;

use crate::errors::LedgerError;

/// Which IO entries of the two orders meet, and which of the clearer's
/// vaults receive the residuals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BountyConfig {
    pub a_input_io_index: usize,
    pub a_output_io_index: usize,
    pub b_input_io_index: usize,
    pub b_output_io_index: usize,
    pub a_bounty_vault_id: U256,
    pub b_bounty_vault_id: U256,
}

impl BountyConfig {
    /// First input and output of both orders, bounties into `vault_id`.
    pub fn new(vault_id: U256) -> Self {
        Self {
            a_bounty_vault_id: vault_id,
            b_bounty_vault_id: vault_id,
            ..Self::default()
        }
    }

    pub fn with_io(mut self, a_input: usize, a_output: usize, b_input: usize, b_output: usize) -> Self {
        self.a_input_io_index = a_input;
        self.a_output_io_index = a_output;
        self.b_input_io_index = b_input;
        self.b_output_io_index = b_output;
        self
    }
}

/// One order's evaluated terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEval {
    pub max_output: U256,
    pub price: U256,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearStateChange {
    pub a_output: U256,
    pub b_output: U256,
    pub a_input: U256,
    pub b_input: U256,
}

impl ClearStateChange {
    /// What `a` gives beyond what `b` needs, if anything.
    pub fn a_bounty(&self) -> Option<U256> {
        self.a_output.checked_sub(self.b_input)
    }

    pub fn b_bounty(&self) -> Option<U256> {
        self.b_output.checked_sub(self.a_input)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClearOutcome {
    Settled(ClearStateChange),
    /// Evaluated but not applied; no balance moved.
    NoOp {
        reason: String,
        change: ClearStateChange,
    },
}

impl ClearOutcome {
    pub fn is_settled(&self) -> bool {
        matches!(self, ClearOutcome::Settled(_))
    }

    pub fn change(&self) -> &ClearStateChange {
        match self {
            ClearOutcome::Settled(change) | ClearOutcome::NoOp { change, .. } => change,
        }
    }
}

/// Each side outputs the lesser of its own maximum and what the other side's
/// price lets it absorb.
pub fn state_change(a: OrderEval, b: OrderEval) -> Result<ClearStateChange, LedgerError> {
    let a_output = a.max_output.min(fp_mul(b.max_output, b.price)?);
    let b_output = b.max_output.min(fp_mul(a.max_output, a.price)?);
    Ok(ClearStateChange {
        a_output,
        b_output,
        a_input: fp_mul(a_output, a.price)?,
        b_input: fp_mul(b_output, b.price)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::numeric::FP_ONE;

    fn eval(max_output: u64, price: U256) -> OrderEval {
        OrderEval {
            max_output: U256::from(max_output) * FP_ONE,
            price,
        }
    }

    #[test]
    fn test_mutual_prices_settle_exactly() {
        // a sells 10 X at 2 Y each, b sells 20 Y at 0.5 X each
        let a = eval(10, FP_ONE * U256::from(2u64));
        let b = eval(20, FP_ONE / U256::from(2u64));
        let change = state_change(a, b).unwrap();
        assert_eq!(change.a_output, U256::from(10u64) * FP_ONE);
        assert_eq!(change.b_output, U256::from(20u64) * FP_ONE);
        assert_eq!(change.a_input, U256::from(20u64) * FP_ONE);
        assert_eq!(change.b_input, U256::from(10u64) * FP_ONE);
        assert_eq!(change.a_bounty(), Some(U256::ZERO));
        assert_eq!(change.b_bounty(), Some(U256::ZERO));
    }

    #[test]
    fn test_output_limited_by_counterparty() {
        // b can only absorb 5 X worth of its 10 Y at price 0.5
        let a = eval(100, FP_ONE);
        let b = eval(10, FP_ONE / U256::from(2u64));
        let change = state_change(a, b).unwrap();
        assert_eq!(change.a_output, U256::from(5u64) * FP_ONE);
        assert_eq!(change.b_output, U256::from(10u64) * FP_ONE);
    }

    #[test]
    fn test_greedy_prices_leave_negative_residual() {
        let a = eval(10, FP_ONE * U256::from(2u64));
        let b = eval(10, FP_ONE * U256::from(2u64));
        let change = state_change(a, b).unwrap();
        assert_eq!(change.a_bounty(), None);
        assert_eq!(change.b_bounty(), None);
    }

    #[test]
    fn test_overflow_is_reported() {
        let a = OrderEval {
            max_output: U256::MAX,
            price: U256::MAX,
        };
        assert!(matches!(
            state_change(a, a),
            Err(LedgerError::Numeric(_))
        ));
    }
}
