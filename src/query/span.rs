//! Span queries for positional and proximity-based matching.
//!
//! Span queries operate on token positions. They nest only other span
//! queries, with two bridges: [`SpanMultiTermQuery`] lifts an ordinary
//! multi-term query (prefix, regexp, range) into the span family, and
//! [`SpanFieldMaskingQuery`] lets a span on one field take part in a span
//! combination over another.

use crate::error::{HalberdError, Result};
use crate::query::{Query, QueryType};

/// A span query that matches a single term.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanTermQuery {
    pub field: String,
    pub value: String,
    pub name: Option<String>,
    pub boost: f64,
}

impl SpanTermQuery {
    /// Create a new span term query.
    pub fn new<F: Into<String>, T: Into<String>>(field: F, value: T) -> Self {
        SpanTermQuery {
            field: field.into(),
            value: value.into(),
            name: None,
            boost: 1.0,
        }
    }
}

/// Matches spans ending no later than `end`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanFirstQuery {
    pub span: Box<SpanQuery>,
    pub end: u32,
    pub name: Option<String>,
    pub boost: f64,
}

impl SpanFirstQuery {
    pub fn new<S: Into<SpanQuery>>(span: S, end: u32) -> Self {
        SpanFirstQuery {
            span: Box::new(span.into()),
            end,
            name: None,
            boost: 1.0,
        }
    }

    /// Set the boost factor.
    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = boost;
        self
    }
}

/// Matches clauses within `slop` positions of each other.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanNearQuery {
    pub clauses: Vec<SpanQuery>,
    pub slop: u32,
    pub in_order: bool,
    pub name: Option<String>,
    pub boost: f64,
}

impl SpanNearQuery {
    pub fn new(clauses: Vec<SpanQuery>, slop: u32, in_order: bool) -> Self {
        SpanNearQuery {
            clauses,
            slop,
            in_order,
            name: None,
            boost: 1.0,
        }
    }
}

/// Matches the union of its clauses.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanOrQuery {
    pub clauses: Vec<SpanQuery>,
    pub name: Option<String>,
    pub boost: f64,
}

impl SpanOrQuery {
    pub fn new(clauses: Vec<SpanQuery>) -> Self {
        SpanOrQuery {
            clauses,
            name: None,
            boost: 1.0,
        }
    }
}

/// Removes `include` matches overlapping `exclude` matches.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanNotQuery {
    pub include: Box<SpanQuery>,
    pub exclude: Box<SpanQuery>,
    /// Tokens before the include span that may not overlap the exclude span.
    pub pre: Option<u32>,
    /// Tokens after the include span that may not overlap the exclude span.
    pub post: Option<u32>,
    pub name: Option<String>,
    pub boost: f64,
}

impl SpanNotQuery {
    pub fn new<I: Into<SpanQuery>, E: Into<SpanQuery>>(include: I, exclude: E) -> Self {
        SpanNotQuery {
            include: Box::new(include.into()),
            exclude: Box::new(exclude.into()),
            pre: None,
            post: None,
            name: None,
            boost: 1.0,
        }
    }
}

/// Matches `big` spans that contain a `little` span.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanContainingQuery {
    pub big: Box<SpanQuery>,
    pub little: Box<SpanQuery>,
    pub name: Option<String>,
    pub boost: f64,
}

impl SpanContainingQuery {
    pub fn new<B: Into<SpanQuery>, L: Into<SpanQuery>>(big: B, little: L) -> Self {
        SpanContainingQuery {
            big: Box::new(big.into()),
            little: Box::new(little.into()),
            name: None,
            boost: 1.0,
        }
    }
}

/// Matches `little` spans enclosed in a `big` span.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanWithinQuery {
    pub big: Box<SpanQuery>,
    pub little: Box<SpanQuery>,
    pub name: Option<String>,
    pub boost: f64,
}

impl SpanWithinQuery {
    pub fn new<B: Into<SpanQuery>, L: Into<SpanQuery>>(big: B, little: L) -> Self {
        SpanWithinQuery {
            big: Box::new(big.into()),
            little: Box::new(little.into()),
            name: None,
            boost: 1.0,
        }
    }
}

/// Presents a span query on one field as if it ran on `field`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanFieldMaskingQuery {
    pub span: Box<SpanQuery>,
    pub field: String,
    pub name: Option<String>,
    pub boost: f64,
}

impl SpanFieldMaskingQuery {
    pub fn new<S: Into<SpanQuery>, F: Into<String>>(span: S, field: F) -> Self {
        SpanFieldMaskingQuery {
            span: Box::new(span.into()),
            field: field.into(),
            name: None,
            boost: 1.0,
        }
    }
}

/// Wraps a prefix, regexp or range query as a span query.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanMultiTermQuery {
    pub query: Box<Query>,
    pub name: Option<String>,
    pub boost: f64,
}

impl SpanMultiTermQuery {
    /// Wrap a multi-term query.
    ///
    /// Any other query type is rejected.
    pub fn new<Q: Into<Query>>(query: Q) -> Result<Self> {
        let query = query.into();
        match query.query_type() {
            QueryType::Prefix | QueryType::Regexp | QueryType::Range => Ok(SpanMultiTermQuery {
                query: Box::new(query),
                name: None,
                boost: 1.0,
            }),
            other => Err(HalberdError::invalid_query(format!(
                "span_multi cannot wrap a {other} query"
            ))),
        }
    }
}

/// A span query node.
#[derive(Debug, Clone, PartialEq)]
pub enum SpanQuery {
    Term(SpanTermQuery),
    First(SpanFirstQuery),
    Near(SpanNearQuery),
    Or(SpanOrQuery),
    Not(SpanNotQuery),
    Containing(SpanContainingQuery),
    Within(SpanWithinQuery),
    FieldMasking(SpanFieldMaskingQuery),
    MultiTerm(SpanMultiTermQuery),
}

macro_rules! with_span {
    ($span:expr, $inner:ident => $body:expr) => {
        match $span {
            SpanQuery::Term($inner) => $body,
            SpanQuery::First($inner) => $body,
            SpanQuery::Near($inner) => $body,
            SpanQuery::Or($inner) => $body,
            SpanQuery::Not($inner) => $body,
            SpanQuery::Containing($inner) => $body,
            SpanQuery::Within($inner) => $body,
            SpanQuery::FieldMasking($inner) => $body,
            SpanQuery::MultiTerm($inner) => $body,
        }
    };
}

impl SpanQuery {
    /// The variant tag.
    pub fn query_type(&self) -> QueryType {
        match self {
            SpanQuery::Term(_) => QueryType::SpanTerm,
            SpanQuery::First(_) => QueryType::SpanFirst,
            SpanQuery::Near(_) => QueryType::SpanNear,
            SpanQuery::Or(_) => QueryType::SpanOr,
            SpanQuery::Not(_) => QueryType::SpanNot,
            SpanQuery::Containing(_) => QueryType::SpanContaining,
            SpanQuery::Within(_) => QueryType::SpanWithin,
            SpanQuery::FieldMasking(_) => QueryType::SpanFieldMasking,
            SpanQuery::MultiTerm(_) => QueryType::SpanMultiTerm,
        }
    }

    pub fn name(&self) -> Option<&str> {
        with_span!(self, s => s.name.as_deref())
    }

    pub fn boost(&self) -> f64 {
        with_span!(self, s => s.boost)
    }

    pub fn set_name(&mut self, name: String) {
        with_span!(self, s => s.name = Some(name))
    }

    pub fn set_boost(&mut self, boost: f64) {
        with_span!(self, s => s.boost = boost)
    }
}

macro_rules! impl_from_span {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for SpanQuery {
                fn from(query: $ty) -> Self {
                    SpanQuery::$variant(query)
                }
            }

            impl From<$ty> for Query {
                fn from(query: $ty) -> Self {
                    Query::Span(SpanQuery::$variant(query))
                }
            }
        )*
    };
}

impl_from_span!(
    Term(SpanTermQuery),
    First(SpanFirstQuery),
    Near(SpanNearQuery),
    Or(SpanOrQuery),
    Not(SpanNotQuery),
    Containing(SpanContainingQuery),
    Within(SpanWithinQuery),
    FieldMasking(SpanFieldMaskingQuery),
    MultiTerm(SpanMultiTermQuery),
);
