//! Typed query model.
//!
//! [`Query`] is a closed sum over every query variant the compiler knows how to
//! serialize. Composite variants own their children, so a built query is always
//! a tree. Span variants live in their own family, [`SpanQuery`], reachable
//! through [`Query::Span`].

pub mod boolean;
pub mod compound;
pub mod range;
pub mod span;
pub mod term;
pub mod text;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HalberdError;

pub use self::boolean::{BoolQuery, NotQuery};
pub use self::compound::{
    BoostMode, FilteredQuery, FunctionFilter, FunctionScoreMode, FunctionScoreQuery,
    NestedQuery, ScoreFunction, ScoreMode,
};
pub use self::range::{RangeBounds, RangeQuery};
pub use self::span::{
    SpanContainingQuery, SpanFieldMaskingQuery, SpanFirstQuery, SpanMultiTermQuery,
    SpanNearQuery, SpanNotQuery, SpanOrQuery, SpanQuery, SpanTermQuery, SpanWithinQuery,
};
pub use self::term::{ExistsQuery, PrefixQuery, RegexpQuery, TermQuery, TermsQuery};
pub use self::text::{
    CommonQuery, FuzzinessConfig, MatchQuery, MoreLikeThisQuery, MultiMatchQuery,
    MultiMatchType, WeightedFields,
};

pub(crate) fn default_boost() -> f64 {
    1.0
}

/// Variant tag of a query node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    Term,
    Terms,
    Range,
    Match,
    MultiMatch,
    Common,
    Prefix,
    Regexp,
    Exists,
    Bool,
    Filtered,
    Nested,
    FunctionScore,
    MoreLikeThis,
    Not,
    SpanTerm,
    SpanFirst,
    SpanNear,
    SpanOr,
    SpanNot,
    SpanContaining,
    SpanWithin,
    SpanFieldMasking,
    SpanMultiTerm,
}

impl QueryType {
    /// All query types.
    pub const ALL: [QueryType; 24] = [
        QueryType::Term,
        QueryType::Terms,
        QueryType::Range,
        QueryType::Match,
        QueryType::MultiMatch,
        QueryType::Common,
        QueryType::Prefix,
        QueryType::Regexp,
        QueryType::Exists,
        QueryType::Bool,
        QueryType::Filtered,
        QueryType::Nested,
        QueryType::FunctionScore,
        QueryType::MoreLikeThis,
        QueryType::Not,
        QueryType::SpanTerm,
        QueryType::SpanFirst,
        QueryType::SpanNear,
        QueryType::SpanOr,
        QueryType::SpanNot,
        QueryType::SpanContaining,
        QueryType::SpanWithin,
        QueryType::SpanFieldMasking,
        QueryType::SpanMultiTerm,
    ];

    /// Name used as the fragment `type` discriminator.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Term => "term",
            QueryType::Terms => "terms",
            QueryType::Range => "range",
            QueryType::Match => "match",
            QueryType::MultiMatch => "multi_match",
            QueryType::Common => "common",
            QueryType::Prefix => "prefix",
            QueryType::Regexp => "regexp",
            QueryType::Exists => "exists",
            QueryType::Bool => "bool",
            QueryType::Filtered => "filtered",
            QueryType::Nested => "nested",
            QueryType::FunctionScore => "function_score",
            QueryType::MoreLikeThis => "more_like_this",
            QueryType::Not => "not",
            QueryType::SpanTerm => "span_term",
            QueryType::SpanFirst => "span_first",
            QueryType::SpanNear => "span_near",
            QueryType::SpanOr => "span_or",
            QueryType::SpanNot => "span_not",
            QueryType::SpanContaining => "span_containing",
            QueryType::SpanWithin => "span_within",
            QueryType::SpanFieldMasking => "span_field_masking",
            QueryType::SpanMultiTerm => "span_multi",
        }
    }

    /// Whether this is a span query type.
    pub fn is_span(&self) -> bool {
        matches!(
            self,
            QueryType::SpanTerm
                | QueryType::SpanFirst
                | QueryType::SpanNear
                | QueryType::SpanOr
                | QueryType::SpanNot
                | QueryType::SpanContaining
                | QueryType::SpanWithin
                | QueryType::SpanFieldMasking
                | QueryType::SpanMultiTerm
        )
    }

    /// Whether this type owns child queries.
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            QueryType::Bool
                | QueryType::Filtered
                | QueryType::Nested
                | QueryType::FunctionScore
                | QueryType::Not
        )
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryType {
    type Err = HalberdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueryType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| HalberdError::invalid_query(format!("unknown query type: {s}")))
    }
}

/// How many optional clauses or terms must match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MinimumShouldMatch {
    /// An absolute count.
    Count(i64),
    /// A backend expression such as `"100%"` or `"2<75%"`.
    Expression(String),
}

impl MinimumShouldMatch {
    /// Wire representation.
    pub fn to_json(&self) -> Value {
        match self {
            MinimumShouldMatch::Count(n) => Value::from(*n),
            MinimumShouldMatch::Expression(s) => Value::from(s.as_str()),
        }
    }
}

impl Default for MinimumShouldMatch {
    fn default() -> Self {
        MinimumShouldMatch::Count(1)
    }
}

impl From<i64> for MinimumShouldMatch {
    fn from(count: i64) -> Self {
        MinimumShouldMatch::Count(count)
    }
}

impl From<i32> for MinimumShouldMatch {
    fn from(count: i32) -> Self {
        MinimumShouldMatch::Count(i64::from(count))
    }
}

impl From<&str> for MinimumShouldMatch {
    fn from(expression: &str) -> Self {
        MinimumShouldMatch::Expression(expression.to_string())
    }
}

/// A query node.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Term(TermQuery),
    Terms(TermsQuery),
    Range(RangeQuery),
    Match(MatchQuery),
    MultiMatch(MultiMatchQuery),
    Common(CommonQuery),
    Prefix(PrefixQuery),
    Regexp(RegexpQuery),
    Exists(ExistsQuery),
    Bool(BoolQuery),
    Filtered(FilteredQuery),
    Nested(NestedQuery),
    FunctionScore(FunctionScoreQuery),
    MoreLikeThis(MoreLikeThisQuery),
    Not(NotQuery),
    Span(SpanQuery),
}

macro_rules! with_variant {
    ($query:expr, $inner:ident => $body:expr, $span:ident => $span_body:expr) => {
        match $query {
            Query::Term($inner) => $body,
            Query::Terms($inner) => $body,
            Query::Range($inner) => $body,
            Query::Match($inner) => $body,
            Query::MultiMatch($inner) => $body,
            Query::Common($inner) => $body,
            Query::Prefix($inner) => $body,
            Query::Regexp($inner) => $body,
            Query::Exists($inner) => $body,
            Query::Bool($inner) => $body,
            Query::Filtered($inner) => $body,
            Query::Nested($inner) => $body,
            Query::FunctionScore($inner) => $body,
            Query::MoreLikeThis($inner) => $body,
            Query::Not($inner) => $body,
            Query::Span($span) => $span_body,
        }
    };
}

impl Query {
    /// The variant tag.
    pub fn query_type(&self) -> QueryType {
        match self {
            Query::Term(_) => QueryType::Term,
            Query::Terms(_) => QueryType::Terms,
            Query::Range(_) => QueryType::Range,
            Query::Match(_) => QueryType::Match,
            Query::MultiMatch(_) => QueryType::MultiMatch,
            Query::Common(_) => QueryType::Common,
            Query::Prefix(_) => QueryType::Prefix,
            Query::Regexp(_) => QueryType::Regexp,
            Query::Exists(_) => QueryType::Exists,
            Query::Bool(_) => QueryType::Bool,
            Query::Filtered(_) => QueryType::Filtered,
            Query::Nested(_) => QueryType::Nested,
            Query::FunctionScore(_) => QueryType::FunctionScore,
            Query::MoreLikeThis(_) => QueryType::MoreLikeThis,
            Query::Not(_) => QueryType::Not,
            Query::Span(span) => span.query_type(),
        }
    }

    /// The diagnostic label, if any.
    pub fn name(&self) -> Option<&str> {
        with_variant!(self, q => q.name.as_deref(), s => s.name())
    }

    /// The boost factor.
    pub fn boost(&self) -> f64 {
        with_variant!(self, q => q.boost, s => s.boost())
    }

    /// Set the diagnostic label.
    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        let name = name.into();
        with_variant!(self, q => q.name = Some(name), s => s.set_name(name))
    }

    /// Set the boost factor.
    pub fn set_boost(&mut self, boost: f64) {
        with_variant!(self, q => q.boost = boost, s => s.set_boost(boost))
    }

    /// Builder-style [`Query::set_name`].
    pub fn named<S: Into<String>>(mut self, name: S) -> Self {
        self.set_name(name);
        self
    }

    /// Builder-style [`Query::set_boost`].
    pub fn boosted(mut self, boost: f64) -> Self {
        self.set_boost(boost);
        self
    }
}

macro_rules! impl_from_variant {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Query {
                fn from(query: $ty) -> Self {
                    Query::$variant(query)
                }
            }
        )*
    };
}

impl_from_variant!(
    Term(TermQuery),
    Terms(TermsQuery),
    Range(RangeQuery),
    Match(MatchQuery),
    MultiMatch(MultiMatchQuery),
    Common(CommonQuery),
    Prefix(PrefixQuery),
    Regexp(RegexpQuery),
    Exists(ExistsQuery),
    Bool(BoolQuery),
    Filtered(FilteredQuery),
    Nested(NestedQuery),
    FunctionScore(FunctionScoreQuery),
    MoreLikeThis(MoreLikeThisQuery),
    Not(NotQuery),
    Span(SpanQuery),
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_type_round_trips_through_names() {
        for query_type in QueryType::ALL {
            assert_eq!(query_type.as_str().parse::<QueryType>().unwrap(), query_type);
        }
        assert!("match_all".parse::<QueryType>().is_err());
    }

    #[test]
    fn test_span_and_composite_classification() {
        assert!(QueryType::SpanMultiTerm.is_span());
        assert!(!QueryType::Term.is_span());
        assert!(QueryType::Not.is_composite());
        assert!(!QueryType::SpanNear.is_composite());
    }

    #[test]
    fn test_name_and_boost_accessors() {
        let query: Query = TermQuery::new("sku", "ABC-1").into();
        assert_eq!(query.boost(), 1.0);
        assert_eq!(query.name(), None);

        let query = query.named("sku_match").boosted(3.0);
        assert_eq!(query.name(), Some("sku_match"));
        assert_eq!(query.boost(), 3.0);
        assert_eq!(query.query_type(), QueryType::Term);
    }

    #[test]
    fn test_span_query_reports_span_type() {
        let query: Query = SpanQuery::from(SpanTermQuery::new("name", "red")).into();
        assert_eq!(query.query_type(), QueryType::SpanTerm);
        assert_eq!(query.boost(), 1.0);
    }

    #[test]
    fn test_minimum_should_match_wire_form() {
        assert_eq!(MinimumShouldMatch::default().to_json(), serde_json::json!(1));
        assert_eq!(
            MinimumShouldMatch::from("100%").to_json(),
            serde_json::json!("100%")
        );
        let parsed: MinimumShouldMatch = serde_json::from_str("\"75%\"").unwrap();
        assert_eq!(parsed, MinimumShouldMatch::Expression("75%".to_string()));
    }
}
