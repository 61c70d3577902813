//! Matcher configuration

use serde::{Deserialize, Serialize};

/// How far ahead an order's terms are sampled when forecasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// One simulated hour.
    pub horizon_seconds: u64,
    /// Blocks in the same hour.
    pub horizon_blocks: u64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            horizon_seconds: 3600,
            horizon_blocks: 1800,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: MatcherConfig = serde_json::from_str(r#"{"horizon_seconds": 60}"#).unwrap();
        assert_eq!(config.horizon_seconds, 60);
        assert_eq!(config.horizon_blocks, 1800);
    }
}
