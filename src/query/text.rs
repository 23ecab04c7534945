//! Analyzed full-text leaf queries.
//!
//! These are the queries the fulltext assembler produces: `match`,
//! `multi_match` and `common`, plus `more_like_this` for similar-product
//! lookups.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::{MinimumShouldMatch, default_boost};

/// Field name to weight. Rendered as `field^weight` on the wire.
pub type WeightedFields = BTreeMap<String, f64>;

/// Fuzzy matching parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzinessConfig {
    /// Edit distance, either `"AUTO"` or a number given as a string.
    pub value: String,
    /// Leading characters that must match exactly.
    pub prefix_length: u32,
    /// Maximum number of term variations.
    pub max_expansions: u32,
}

impl Default for FuzzinessConfig {
    fn default() -> Self {
        FuzzinessConfig {
            value: "AUTO".to_string(),
            prefix_length: 1,
            max_expansions: 10,
        }
    }
}

/// Analyzed query on one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchQuery {
    pub field: String,
    #[serde(alias = "query")]
    pub query_text: String,
    #[serde(default)]
    pub minimum_should_match: MinimumShouldMatch,
    #[serde(default)]
    pub fuzziness: Option<FuzzinessConfig>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_boost")]
    pub boost: f64,
}

impl MatchQuery {
    /// Create a new match query.
    pub fn new<F: Into<String>, T: Into<String>>(field: F, query_text: T) -> Self {
        MatchQuery {
            field: field.into(),
            query_text: query_text.into(),
            minimum_should_match: MinimumShouldMatch::default(),
            fuzziness: None,
            name: None,
            boost: 1.0,
        }
    }

    /// Set the minimum should match expression.
    pub fn minimum_should_match<M: Into<MinimumShouldMatch>>(mut self, msm: M) -> Self {
        self.minimum_should_match = msm.into();
        self
    }
}

/// How a multi-match combines per-field scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiMatchType {
    #[default]
    BestFields,
    MostFields,
    CrossFields,
    Phrase,
    PhrasePrefix,
}

impl MultiMatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MultiMatchType::BestFields => "best_fields",
            MultiMatchType::MostFields => "most_fields",
            MultiMatchType::CrossFields => "cross_fields",
            MultiMatchType::Phrase => "phrase",
            MultiMatchType::PhrasePrefix => "phrase_prefix",
        }
    }
}

fn default_tie_breaker() -> f64 {
    1.0
}

/// Analyzed query over several weighted fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiMatchQuery {
    #[serde(deserialize_with = "deserialize_weighted_fields")]
    pub fields: WeightedFields,
    #[serde(alias = "query")]
    pub query_text: String,
    #[serde(default)]
    pub minimum_should_match: MinimumShouldMatch,
    #[serde(default = "default_tie_breaker")]
    pub tie_breaker: f64,
    #[serde(default)]
    pub cutoff_frequency: Option<f64>,
    #[serde(default)]
    pub fuzziness: Option<FuzzinessConfig>,
    #[serde(default, alias = "type_of_match")]
    pub match_type: MultiMatchType,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_boost")]
    pub boost: f64,
}

impl MultiMatchQuery {
    /// Create a new multi-match query.
    pub fn new<T: Into<String>>(query_text: T, fields: WeightedFields) -> Self {
        MultiMatchQuery {
            fields,
            query_text: query_text.into(),
            minimum_should_match: MinimumShouldMatch::default(),
            tie_breaker: 1.0,
            cutoff_frequency: None,
            fuzziness: None,
            match_type: MultiMatchType::default(),
            name: None,
            boost: 1.0,
        }
    }

    pub fn minimum_should_match<M: Into<MinimumShouldMatch>>(mut self, msm: M) -> Self {
        self.minimum_should_match = msm.into();
        self
    }

    pub fn tie_breaker(mut self, tie_breaker: f64) -> Self {
        self.tie_breaker = tie_breaker;
        self
    }

    pub fn cutoff_frequency(mut self, cutoff_frequency: f64) -> Self {
        self.cutoff_frequency = Some(cutoff_frequency);
        self
    }

    pub fn fuzziness(mut self, fuzziness: FuzzinessConfig) -> Self {
        self.fuzziness = Some(fuzziness);
        self
    }

    /// Fields formatted as `field^weight`, in field-name order.
    pub fn weighted_field_names(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|(field, weight)| format!("{field}^{weight}"))
            .collect()
    }
}

fn default_cutoff_frequency() -> f64 {
    0.1
}

/// Splits terms into low and high frequency groups before matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonQuery {
    pub field: String,
    #[serde(alias = "query")]
    pub query_text: String,
    #[serde(default = "default_cutoff_frequency")]
    pub cutoff_frequency: f64,
    #[serde(default)]
    pub minimum_should_match: MinimumShouldMatch,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_boost")]
    pub boost: f64,
}

impl CommonQuery {
    /// Create a new common terms query.
    pub fn new<F: Into<String>, T: Into<String>>(field: F, query_text: T) -> Self {
        CommonQuery {
            field: field.into(),
            query_text: query_text.into(),
            cutoff_frequency: default_cutoff_frequency(),
            minimum_should_match: MinimumShouldMatch::default(),
            name: None,
            boost: 1.0,
        }
    }
}

fn default_mlt_minimum_should_match() -> MinimumShouldMatch {
    MinimumShouldMatch::Expression("30%".to_string())
}

/// Finds documents similar to the given documents or texts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoreLikeThisQuery {
    pub fields: Vec<String>,
    /// Free texts or `{"_id": ...}` document references.
    pub like: Vec<Value>,
    #[serde(default = "default_mlt_minimum_should_match")]
    pub minimum_should_match: MinimumShouldMatch,
    #[serde(default)]
    pub include: bool,
    #[serde(default)]
    pub min_term_freq: Option<u32>,
    #[serde(default)]
    pub min_doc_freq: Option<u32>,
    #[serde(default)]
    pub max_query_terms: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_boost")]
    pub boost: f64,
}

impl MoreLikeThisQuery {
    /// Create a new more-like-this query.
    pub fn new<I, S>(fields: I, like: Vec<Value>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MoreLikeThisQuery {
            fields: fields.into_iter().map(Into::into).collect(),
            like,
            minimum_should_match: default_mlt_minimum_should_match(),
            include: false,
            min_term_freq: None,
            min_doc_freq: None,
            max_query_terms: None,
            name: None,
            boost: 1.0,
        }
    }
}

/// Accepts `{"name": 2.0}` or `["name", "sku"]` (weight 1).
fn deserialize_weighted_fields<'de, D>(deserializer: D) -> Result<WeightedFields, D::Error>
where
    D: Deserializer<'de>,
{
    struct WeightedFieldsVisitor;

    impl<'de> Visitor<'de> for WeightedFieldsVisitor {
        type Value = WeightedFields;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of field weights or a list of field names")
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut fields = WeightedFields::new();
            while let Some(field) = seq.next_element::<String>()? {
                fields.insert(field, 1.0);
            }
            Ok(fields)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut fields = WeightedFields::new();
            while let Some((field, weight)) = map.next_entry::<String, f64>()? {
                if !weight.is_finite() {
                    return Err(de::Error::custom(format!("invalid weight for {field}")));
                }
                fields.insert(field, weight);
            }
            Ok(fields)
        }
    }

    deserializer.deserialize_any(WeightedFieldsVisitor)
}
