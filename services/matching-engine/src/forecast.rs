//! Forecast bounds
//!
//! An order's rule may depend on time or block height, so its terms are
//! sampled twice: now and one horizon later. The bounds bracket both samples.

use alloy_primitives::U256;
use orderbook::OrderEval;
use serde::{Deserialize, Serialize};
use types::errors::NumericError;
use types::numeric::fp_mul;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forecast {
    pub min_price: U256,
    pub max_price: U256,
    pub min_output: U256,
    pub max_output: U256,
    /// Input implied by each sample's output at its own price.
    pub min_input: U256,
    pub max_input: U256,
}

impl Forecast {
    pub fn from_samples(samples: &[OrderEval]) -> Result<Self, NumericError> {
        let mut forecast: Option<Forecast> = None;
        for sample in samples {
            let input = fp_mul(sample.max_output, sample.price)?;
            forecast = Some(match forecast {
                None => Forecast {
                    min_price: sample.price,
                    max_price: sample.price,
                    min_output: sample.max_output,
                    max_output: sample.max_output,
                    min_input: input,
                    max_input: input,
                },
                Some(f) => Forecast {
                    min_price: f.min_price.min(sample.price),
                    max_price: f.max_price.max(sample.price),
                    min_output: f.min_output.min(sample.max_output),
                    max_output: f.max_output.max(sample.max_output),
                    min_input: f.min_input.min(input),
                    max_input: f.max_input.max(input),
                },
            });
        }
        Ok(forecast.unwrap_or_default())
    }
}
