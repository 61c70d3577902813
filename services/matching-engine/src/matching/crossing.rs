//! Crossing detection logic
//!
//! Determines when two orders are worth clearing based on their forecasts
//! and which of their IO entries trade against each other.

use serde::{Deserialize, Serialize};
use types::numeric::{fp_mul, FP_ONE};
use types::order::Order;

use crate::forecast::Forecast;

/// Break-even check in both directions: either order may set the price.
///
/// A product that overflows is far past break-even and never crosses.
pub fn can_match(giver: &Forecast, taker: &Forecast) -> bool {
    let breaks_even = |a, b| fp_mul(a, b).map_or(false, |product| product <= FP_ONE);
    breaks_even(giver.min_price, taker.max_price) || breaks_even(giver.max_price, taker.min_price)
}

/// One way two orders' IO lists can meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IoPairing {
    pub a_input: usize,
    pub a_output: usize,
    pub b_input: usize,
    pub b_output: usize,
}

/// Every index combination where `a`'s output is `b`'s input token and
/// `b`'s output is `a`'s input token.
pub fn crossing_ios(a: &Order, b: &Order) -> Vec<IoPairing> {
    let mut pairings = Vec::new();
    for (a_output, a_out) in a.outputs.iter().enumerate() {
        for (b_input, b_in) in b.inputs.iter().enumerate() {
            if a_out.token != b_in.token {
                continue;
            }
            for (b_output, b_out) in b.outputs.iter().enumerate() {
                for (a_input, a_in) in a.inputs.iter().enumerate() {
                    if b_out.token == a_in.token {
                        pairings.push(IoPairing {
                            a_input,
                            a_output,
                            b_input,
                            b_output,
                        });
                    }
                }
            }
        }
    }
    pairings
}
