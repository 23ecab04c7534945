//! Serialization of the typed model into the backend query DSL.
//!
//! Every query variant has an assembler that turns a node of that variant into
//! a JSON document. Assemblers check the variant they are handed and report a
//! [`HalberdError::TypeMismatch`] for anything else; [`QueryCompiler`] routes
//! each node to the right one.

pub mod aggregation;
pub mod query;
pub mod sort;
pub mod span;

use serde_json::{Map, Value, json};

use crate::error::{HalberdError, Result};
use crate::query::{Query, QueryType, SpanQuery};

pub use self::aggregation::{AggregationCompiler, BucketAssembler};
pub use self::query::{
    BoolAssembler, CommonAssembler, ExistsAssembler, FilteredAssembler, FunctionScoreAssembler,
    MatchAssembler, MoreLikeThisAssembler, MultiMatchAssembler, NestedAssembler, NotAssembler,
    PrefixAssembler, RangeAssembler, RegexpAssembler, TermAssembler, TermsAssembler,
};
pub use self::sort::SortCompiler;
pub use self::span::{
    SpanContainingAssembler, SpanFieldMaskingAssembler, SpanFirstAssembler,
    SpanMultiTermAssembler, SpanNearAssembler, SpanNotAssembler, SpanOrAssembler,
    SpanTermAssembler, SpanWithinAssembler,
};

/// Serializes one query variant.
pub trait QueryAssembler {
    /// The variant this assembler accepts.
    fn query_type(&self) -> QueryType;

    /// Serialize `query`, compiling children through `compiler`.
    fn assemble(&self, query: &Query, compiler: &QueryCompiler) -> Result<Value>;
}

/// Serializes one span variant.
pub trait SpanAssembler {
    fn query_type(&self) -> QueryType;

    fn assemble(&self, span: &SpanQuery, compiler: &QueryCompiler) -> Result<Value>;
}

/// Insert `boost` and, when set, `_name`.
pub(crate) fn insert_common(params: &mut Map<String, Value>, boost: f64, name: Option<&str>) {
    params.insert("boost".to_string(), json!(boost));
    if let Some(name) = name {
        params.insert("_name".to_string(), json!(name));
    }
}

pub(crate) fn mismatch(expected: QueryType, query: &Query) -> HalberdError {
    HalberdError::type_mismatch(expected, query.query_type())
}

pub(crate) fn span_mismatch(expected: QueryType, span: &SpanQuery) -> HalberdError {
    HalberdError::type_mismatch(expected, span.query_type())
}

/// Routes query nodes to their assemblers.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryCompiler;

impl QueryCompiler {
    pub fn new() -> Self {
        QueryCompiler
    }

    /// Compile a query tree.
    pub fn compile(&self, query: &Query) -> Result<Value> {
        match query {
            Query::Term(_) => TermAssembler.assemble(query, self),
            Query::Terms(_) => TermsAssembler.assemble(query, self),
            Query::Range(_) => RangeAssembler.assemble(query, self),
            Query::Match(_) => MatchAssembler.assemble(query, self),
            Query::MultiMatch(_) => MultiMatchAssembler.assemble(query, self),
            Query::Common(_) => CommonAssembler.assemble(query, self),
            Query::Prefix(_) => PrefixAssembler.assemble(query, self),
            Query::Regexp(_) => RegexpAssembler.assemble(query, self),
            Query::Exists(_) => ExistsAssembler.assemble(query, self),
            Query::Bool(_) => BoolAssembler.assemble(query, self),
            Query::Filtered(_) => FilteredAssembler.assemble(query, self),
            Query::Nested(_) => NestedAssembler.assemble(query, self),
            Query::FunctionScore(_) => FunctionScoreAssembler.assemble(query, self),
            Query::MoreLikeThis(_) => MoreLikeThisAssembler.assemble(query, self),
            Query::Not(_) => NotAssembler.assemble(query, self),
            Query::Span(span) => self.compile_span(span),
        }
    }

    /// Compile a span tree.
    pub fn compile_span(&self, span: &SpanQuery) -> Result<Value> {
        match span {
            SpanQuery::Term(_) => SpanTermAssembler.assemble(span, self),
            SpanQuery::First(_) => SpanFirstAssembler.assemble(span, self),
            SpanQuery::Near(_) => SpanNearAssembler.assemble(span, self),
            SpanQuery::Or(_) => SpanOrAssembler.assemble(span, self),
            SpanQuery::Not(_) => SpanNotAssembler.assemble(span, self),
            SpanQuery::Containing(_) => SpanContainingAssembler.assemble(span, self),
            SpanQuery::Within(_) => SpanWithinAssembler.assemble(span, self),
            SpanQuery::FieldMasking(_) => SpanFieldMaskingAssembler.assemble(span, self),
            SpanQuery::MultiTerm(_) => SpanMultiTermAssembler.assemble(span, self),
        }
    }
}
