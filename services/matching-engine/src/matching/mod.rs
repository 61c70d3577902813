//! Matching logic module
//!
//! Implements forecast crossing and clear execution

pub mod crossing;
pub mod executor;

pub use crossing::{can_match, crossing_ios, IoPairing};
pub use executor::MatchExecutor;
