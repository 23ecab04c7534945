//! Relevance configuration of a search container.

use serde::{Deserialize, Serialize};

use crate::error::{HalberdError, Result};
use crate::query::{FuzzinessConfig, MinimumShouldMatch};

/// Phonetic matching settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhoneticConfig {
    /// Fuzziness applied on top of phonetic matching.
    pub fuzziness: Option<FuzzinessConfig>,
}

/// Boost given to documents matching the first words of the query in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanConfig {
    /// Zero disables span matching.
    pub span_match_boost: f64,
    /// Number of leading query words matched.
    pub span_size: usize,
}

impl Default for SpanConfig {
    fn default() -> Self {
        SpanConfig {
            span_match_boost: 0.0,
            span_size: 3,
        }
    }
}

impl SpanConfig {
    pub fn is_enabled(&self) -> bool {
        self.span_match_boost > 0.0 && self.span_size > 0
    }
}

/// Replacement boosts used when the query is a single word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SingleTermBoosts {
    pub phrase_match_boost: f64,
    pub sortable_match_boost: f64,
}

impl Default for SingleTermBoosts {
    fn default() -> Self {
        SingleTermBoosts {
            phrase_match_boost: 1.0,
            sortable_match_boost: 1.0,
        }
    }
}

/// Relevance knobs of the fulltext query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceConfig {
    /// Frequency above which a term is considered common.
    pub cutoff_frequency: f64,
    pub minimum_should_match: MinimumShouldMatch,
    pub tie_breaker: f64,
    /// Weight of phrase analyzed fields. Zero or less disables them.
    pub phrase_match_boost: f64,
    pub span: SpanConfig,
    /// Fuzzy matching, disabled when `None`.
    pub fuzziness: Option<FuzzinessConfig>,
    /// Phonetic matching, disabled when `None`.
    pub phonetic: Option<PhoneticConfig>,
    pub single_term_boosts: Option<SingleTermBoosts>,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        RelevanceConfig {
            cutoff_frequency: 0.15,
            minimum_should_match: MinimumShouldMatch::Expression("100%".to_string()),
            tie_breaker: 1.0,
            phrase_match_boost: 10.0,
            span: SpanConfig::default(),
            fuzziness: None,
            phonetic: None,
            single_term_boosts: None,
        }
    }
}

impl RelevanceConfig {
    /// Load from JSON. Missing keys take their default.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RelevanceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the backend cannot accept.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.cutoff_frequency) {
            return Err(HalberdError::config(format!(
                "cutoff frequency must be within [0, 1], got {}",
                self.cutoff_frequency
            )));
        }
        if self.tie_breaker < 0.0 || self.tie_breaker > 1.0 {
            return Err(HalberdError::config(format!(
                "tie breaker must be within [0, 1], got {}",
                self.tie_breaker
            )));
        }
        if self.span.span_match_boost < 0.0 {
            return Err(HalberdError::config("span match boost must not be negative"));
        }
        Ok(())
    }

    pub fn is_fuzziness_enabled(&self) -> bool {
        self.fuzziness.is_some()
    }

    pub fn is_phonetic_enabled(&self) -> bool {
        self.phonetic.is_some()
    }

    pub fn with_fuzziness(mut self, fuzziness: FuzzinessConfig) -> Self {
        self.fuzziness = Some(fuzziness);
        self
    }

    pub fn with_phonetic(mut self, phonetic: PhoneticConfig) -> Self {
        self.phonetic = Some(phonetic);
        self
    }

    pub fn with_span(mut self, span_match_boost: f64, span_size: usize) -> Self {
        self.span = SpanConfig {
            span_match_boost,
            span_size,
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RelevanceConfig::default();
        assert_eq!(config.cutoff_frequency, 0.15);
        assert_eq!(config.phrase_match_boost, 10.0);
        assert!(!config.span.is_enabled());
        assert!(!config.is_fuzziness_enabled());
        assert!(!config.is_phonetic_enabled());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = RelevanceConfig::from_json_str(
            r#"{"span": {"span_match_boost": 5}, "fuzziness": {"value": "1"}}"#,
        )
        .unwrap();

        assert!(config.span.is_enabled());
        assert_eq!(config.span.span_size, 3);
        let fuzziness = config.fuzziness.unwrap();
        assert_eq!(fuzziness.value, "1");
        assert_eq!(fuzziness.max_expansions, 10);
    }

    #[test]
    fn test_validation() {
        let err = RelevanceConfig::from_json_str(r#"{"cutoff_frequency": 2.0}"#).unwrap_err();
        assert!(matches!(err, HalberdError::Config(_)));

        assert!(RelevanceConfig::from_json_str("{not json").is_err());
    }
}
