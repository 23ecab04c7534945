//! The request pipeline: bind, dereference, map, compile.
//!
//! ```text
//! FragmentStore + Parameters
//!        ↓ BindingResolver
//!   BoundFragments
//!        ↓ Dereferencer
//! DereferencedFragments ── ResolvedRequest
//!        ↓ mapper
//!   Query / Bucket / SortOrder
//!        ↓ QueryCompiler, AggregationCompiler, SortCompiler
//!   wire document
//! ```

pub mod mapper;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::aggregation::Bucket;
use crate::dsl::{AggregationCompiler, QueryCompiler, SortCompiler};
use crate::error::Result;
use crate::fragment::{BindingResolver, DereferencedFragments, Dereferencer, FragmentStore, Parameters};
use crate::query::{BoolQuery, FilteredQuery, Query};
use crate::sort::SortOrder;

pub use self::mapper::{build_bucket, build_query, build_sort_order, build_span};

/// Fragments of one request, bound and dereferenced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedRequest {
    fragments: DereferencedFragments,
}

impl ResolvedRequest {
    /// Bind `store` against `parameters` and resolve its references.
    pub fn resolve(store: &FragmentStore, parameters: &Parameters) -> Self {
        let bound = BindingResolver::new(parameters).resolve(store);
        let fragments = Dereferencer::new(&bound).resolve();
        ResolvedRequest { fragments }
    }

    pub fn from_fragments(fragments: DereferencedFragments) -> Self {
        ResolvedRequest { fragments }
    }

    pub fn fragments(&self) -> &DereferencedFragments {
        &self.fragments
    }

    pub fn root_query(&self) -> Option<Query> {
        self.fragments.root_query.as_ref().and_then(build_query)
    }

    pub fn root_filter(&self) -> Option<Query> {
        self.fragments.root_filter.as_ref().and_then(build_query)
    }

    /// Buckets that built, in declaration order.
    pub fn aggregations(&self) -> Vec<Bucket> {
        self.fragments
            .aggregations
            .iter()
            .filter_map(|(name, fragment)| {
                let bucket = build_bucket(name, fragment);
                if bucket.is_none() {
                    debug!("aggregation {name} did not build");
                }
                bucket
            })
            .collect()
    }

    /// Sort orders that built, in declaration order.
    pub fn sort_orders(&self) -> Vec<SortOrder> {
        self.fragments
            .sort_orders
            .iter()
            .filter_map(|(name, fragment)| {
                let order = build_sort_order(fragment);
                if order.is_none() {
                    debug!("sort order {name} did not build");
                }
                order
            })
            .collect()
    }

    /// The root query with `injected` added, restricted by the root filter.
    ///
    /// `None` when nothing survived resolution.
    pub fn query(&self, injected: Option<Query>) -> Option<Query> {
        let query = inject_query(self.root_query(), injected);
        match self.root_filter() {
            Some(filter) => FilteredQuery::new(query, Some(filter)).map(Query::from),
            None => query,
        }
    }
}

/// Add `injected` to `root`.
///
/// Without a root it stands alone; a bool root takes it as one more `must`
/// clause; any other root is paired with it under a new bool.
pub fn inject_query(root: Option<Query>, injected: Option<Query>) -> Option<Query> {
    match (root, injected) {
        (root, None) => root,
        (None, Some(injected)) => Some(injected),
        (Some(Query::Bool(mut bool_query)), Some(injected)) => {
            bool_query.must.push(injected);
            Some(Query::Bool(bool_query))
        }
        (Some(root), Some(injected)) => Some(BoolQuery::new().must(root).must(injected).into()),
    }
}

fn default_size() -> usize {
    10
}

/// A search request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub from: usize,
    #[serde(default = "default_size")]
    pub size: usize,
    #[serde(default)]
    pub track_total_hits: bool,
    #[serde(default)]
    pub fragments: FragmentStore,
    #[serde(default)]
    pub parameters: Parameters,
    /// Injected into the root query, typically a fulltext query.
    #[serde(skip)]
    pub query_override: Option<Query>,
}

impl SearchRequest {
    pub fn new(fragments: FragmentStore) -> Self {
        SearchRequest {
            index: None,
            from: 0,
            size: default_size(),
            track_total_hits: false,
            fragments,
            parameters: Parameters::new(),
            query_override: None,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_query<Q: Into<Query>>(mut self, query: Q) -> Self {
        self.query_override = Some(query.into());
        self
    }

    pub fn page(mut self, from: usize, size: usize) -> Self {
        self.from = from;
        self.size = size;
        self
    }
}

/// Runs the whole pipeline for a [`SearchRequest`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestCompiler {
    queries: QueryCompiler,
    aggregations: AggregationCompiler,
    sorts: SortCompiler,
}

impl RequestCompiler {
    pub fn new() -> Self {
        RequestCompiler::default()
    }

    /// Compile a query, or match everything when there is none.
    pub fn compile_query(&self, query: Option<&Query>) -> Result<Value> {
        match query {
            Some(query) => self.queries.compile(query),
            None => {
                let match_all = FilteredQuery {
                    query: None,
                    filter: None,
                    name: None,
                    boost: 1.0,
                };
                self.queries.compile(&match_all.into())
            }
        }
    }

    /// Compile a resolved request into the wire document.
    pub fn compile_resolved(
        &self,
        resolved: &ResolvedRequest,
        request: &SearchRequest,
    ) -> Result<Value> {
        let query = resolved.query(request.query_override.clone());
        let sort_orders = resolved.sort_orders();
        let buckets = resolved.aggregations();
        debug!(
            "compiling request: query={}, {} sort orders, {} aggregations",
            query.is_some(),
            sort_orders.len(),
            buckets.len()
        );

        let mut document = Map::new();
        document.insert("query".to_string(), self.compile_query(query.as_ref())?);
        if !sort_orders.is_empty() {
            let sort = self.sorts.compile_all(&sort_orders)?;
            document.insert("sort".to_string(), Value::Array(sort));
        }
        if !buckets.is_empty() {
            let aggregations = self.aggregations.compile_all(&buckets)?;
            document.insert("aggregations".to_string(), Value::Object(aggregations));
        }
        document.insert("from".to_string(), json!(request.from));
        document.insert("size".to_string(), json!(request.size));
        document.insert("track_total_hits".to_string(), json!(request.track_total_hits));
        Ok(Value::Object(document))
    }

    /// Bind, dereference, map and compile a request.
    pub fn compile_request(&self, request: &SearchRequest) -> Result<Value> {
        let resolved = ResolvedRequest::resolve(&request.fragments, &request.parameters);
        self.compile_resolved(&resolved, request)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::query::{QueryType, TermQuery};

    fn store(value: Value) -> FragmentStore {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_inject_into_bool_root() {
        let root = BoolQuery::new().must(TermQuery::new("brand", "acme")).into();
        let injected = TermQuery::new("color", "red").into();
        let Some(Query::Bool(combined)) = inject_query(Some(root), Some(injected)) else {
            panic!("expected a bool query");
        };
        assert_eq!(combined.must.len(), 2);
    }

    #[test]
    fn test_inject_next_to_leaf_root() {
        let root = TermQuery::new("brand", "acme").into();
        let injected = TermQuery::new("color", "red").into();
        let combined = inject_query(Some(root), Some(injected)).unwrap();
        assert_eq!(combined.query_type(), QueryType::Bool);

        let alone = inject_query(None, Some(TermQuery::new("color", "red").into())).unwrap();
        assert_eq!(alone.query_type(), QueryType::Term);
        assert!(inject_query(None, None).is_none());
    }

    #[test]
    fn test_root_filter_wraps_query() {
        let store = store(json!({
            "root_query": "main",
            "root_filter": "visible",
            "queries": {"main": {"type": "term", "field": "brand", "value": "$brand$"}},
            "filters": {"visible": {"type": "term", "field": "visible", "value": true}}
        }));
        let parameters = Parameters::new().with("brand", json!("acme"));

        let resolved = ResolvedRequest::resolve(&store, &parameters);
        let query = resolved.query(None).unwrap();
        let Query::Filtered(filtered) = query else {
            panic!("expected a filtered query");
        };
        assert!(filtered.query().is_some());
        assert!(filtered.filter().is_some());
    }

    #[test]
    fn test_unbound_request_matches_everything() {
        let store = store(json!({
            "root_query": "main",
            "queries": {"main": {"type": "term", "field": "brand", "value": "$brand$"}}
        }));
        let request = SearchRequest::new(store);

        let compiled = RequestCompiler::new().compile_request(&request).unwrap();
        assert_eq!(
            compiled,
            json!({
                "query": {"constant_score": {"filter": {"match_all": {}}, "boost": 1.0}},
                "from": 0,
                "size": 10,
                "track_total_hits": false
            })
        );
    }

    #[test]
    fn test_request_envelope_from_json() {
        let request = SearchRequest::from_json_str(
            r#"{
                "index": "catalog",
                "from": 20,
                "track_total_hits": true,
                "fragments": {"root_query": "main", "queries": {}},
                "parameters": {"q": "shoes"}
            }"#,
        )
        .unwrap();

        assert_eq!(request.index.as_deref(), Some("catalog"));
        assert_eq!(request.from, 20);
        assert_eq!(request.size, 10);
        assert!(request.track_total_hits);
        assert_eq!(request.parameters.len(), 1);
        assert!(request.query_override.is_none());
    }
}
