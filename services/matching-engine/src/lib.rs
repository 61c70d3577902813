//! Matching Engine Service
//!
//! Forecasts every registered order's terms over a fixed horizon and greedily
//! clears the pairs whose forecasts cross.
//!
//! **Key Invariants:**
//! - Only orders with a funded output vault give in a pair
//! - Each clear is fully applied before the next pair is examined
//! - Every attempted clear is reported, including those with no effect

pub mod config;
pub mod engine;
pub mod events;
pub mod forecast;
pub mod matching;

pub use config::MatcherConfig;
pub use engine::{MatchError, Matchmaker};
pub use events::MatchRecord;
pub use forecast::Forecast;
