//! Fulltext query assembly.
//!
//! Turns user query text into a relevance query over the mapped fields. The
//! shape of the result depends on how the text was classified by a
//! [`Spellchecker`]: pure stop words, misspelled (fuzzy) or exact.

pub mod builder;
pub mod container;
pub mod relevance;
pub mod rewrite;
pub mod spelling;

use serde::{Deserialize, Serialize};

pub use self::builder::{
    EXACT_QUERY_NAME, FulltextQueryBuilder, PURE_STOPWORDS_QUERY_NAME, SPELLCHECK_QUERY_NAME,
};
pub use self::container::ContainerConfiguration;
pub use self::relevance::{PhoneticConfig, RelevanceConfig, SingleTermBoosts, SpanConfig};
pub use self::rewrite::{QueryRewriter, Rewrites, SynonymRewriter, expand_query_text};
pub use self::spelling::{DEFAULT_STOP_WORDS, SpellingType, Spellchecker, StopwordSpellchecker};

/// One alternative of a query text, with the boost it is searched at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedQueryText {
    pub text: QueryText,
    pub weight: f64,
}

impl WeightedQueryText {
    pub fn new<T: Into<QueryText>>(text: T, weight: f64) -> Self {
        WeightedQueryText {
            text: text.into(),
            weight,
        }
    }
}

/// User query text: a single string or a list of weighted alternatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryText {
    Text(String),
    Alternatives(Vec<WeightedQueryText>),
}

impl QueryText {
    /// The text, when this is not a list.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            QueryText::Text(text) => Some(text),
            QueryText::Alternatives(_) => None,
        }
    }
}

impl From<&str> for QueryText {
    fn from(text: &str) -> Self {
        QueryText::Text(text.to_string())
    }
}

impl From<String> for QueryText {
    fn from(text: String) -> Self {
        QueryText::Text(text)
    }
}

impl From<Vec<String>> for QueryText {
    fn from(texts: Vec<String>) -> Self {
        QueryText::Alternatives(
            texts
                .into_iter()
                .map(|text| WeightedQueryText::new(text, 1.0))
                .collect(),
        )
    }
}
