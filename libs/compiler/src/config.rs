//! Compiler configuration

use serde::{Deserialize, Serialize};

/// Default placeholder token for extra outputs.
pub const DEFAULT_PLACEHOLDER: &str = "_";

/// Default limit on nested parentheses.
pub const DEFAULT_MAX_NESTING: usize = 128;

/// Compiler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Token standing for an extra output of a multi-output opcode.
    pub placeholder: String,
    /// Parentheses nested deeper than this become a single Error node.
    pub max_nesting: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }
}

impl CompilerConfig {
    pub fn with_placeholder(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
            ..Self::default()
        }
    }

    /// The configured placeholder, falling back to the default when blank.
    pub fn placeholder(&self) -> &str {
        let trimmed = self.placeholder.trim();
        if trimmed.is_empty() {
            DEFAULT_PLACEHOLDER
        } else {
            trimmed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_placeholder() {
        assert_eq!(CompilerConfig::default().placeholder(), "_");
        assert_eq!(CompilerConfig::with_placeholder("  ").placeholder(), "_");
        assert_eq!(CompilerConfig::with_placeholder("?").placeholder(), "?");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: CompilerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CompilerConfig::default());
        assert_eq!(config.max_nesting, DEFAULT_MAX_NESTING);
    }
}
