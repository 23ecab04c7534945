//! Compiler-wide settings.

use serde::{Deserialize, Serialize};

use crate::error::{HalberdError, Result};
use crate::mapping::{DEFAULT_SEARCH_FIELD, DEFAULT_SPELLING_FIELD};

/// Default bound on nested query text alternatives.
pub const MAX_FULLTEXT_DEPTH: usize = 10;

/// Settings shared by every request compiled with one compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Deepest nesting of query text alternatives accepted.
    pub max_fulltext_depth: usize,
    /// Catch-all field for exact matching.
    pub search_field: String,
    /// Catch-all field for fuzzy and phonetic matching.
    pub spelling_field: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            max_fulltext_depth: MAX_FULLTEXT_DEPTH,
            search_field: DEFAULT_SEARCH_FIELD.to_string(),
            spelling_field: DEFAULT_SPELLING_FIELD.to_string(),
        }
    }
}

impl CompilerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: CompilerConfig = serde_json::from_str(json)?;
        if config.search_field.is_empty() || config.spelling_field.is_empty() {
            return Err(HalberdError::config("catch-all field names must not be empty"));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let config = CompilerConfig::from_json_str(r#"{"max_fulltext_depth": 3}"#).unwrap();
        assert_eq!(config.max_fulltext_depth, 3);
        assert_eq!(config.search_field, "search");
        assert_eq!(config.spelling_field, "spelling");
    }

    #[test]
    fn test_empty_field_rejected() {
        assert!(CompilerConfig::from_json_str(r#"{"search_field": ""}"#).is_err());
    }
}
