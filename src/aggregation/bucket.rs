//! Bucket aggregations.
//!
//! Every bucket shares a common envelope ([`Bucket`]): a name, metric, pipeline
//! and child sub-aggregations, an optional nested path with its filter, and an
//! optional outer filter. What differs per variant lives in [`BucketKind`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregation::{BucketType, MAX_BUCKET_SIZE, MAX_TOP_HITS_SIZE, Metric, Pipeline};
use crate::error::{HalberdError, Result};
use crate::query::Query;
use crate::sort::SortOrder;

/// Clamp a requested bucket count into `(0, MAX_BUCKET_SIZE)`.
///
/// Zero and anything at or above the maximum mean "as many as allowed".
pub fn clamp_bucket_size(size: usize) -> usize {
    if size > 0 && size < MAX_BUCKET_SIZE {
        size
    } else {
        MAX_BUCKET_SIZE
    }
}

/// Clamp a requested top hits count. Zero keeps the default of one hit.
pub fn clamp_top_hits_size(size: usize) -> usize {
    match size {
        0 => default_top_hits_size(),
        size => size.min(MAX_TOP_HITS_SIZE),
    }
}

/// Ordering of term buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermSortOrder {
    /// By document count, descending.
    #[default]
    #[serde(rename = "_count", alias = "count")]
    Count,
    /// By term, ascending.
    #[serde(rename = "_key", alias = "_term", alias = "key")]
    Key,
    /// By the best score of matching documents.
    #[serde(rename = "_score", alias = "relevance")]
    Relevance,
    /// In the order of the `include` list.
    #[serde(rename = "_manual", alias = "manual")]
    Manual,
}

/// Terms aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermBucket {
    pub field: String,
    #[serde(default)]
    pub size: usize,
    #[serde(default)]
    pub sort_order: TermSortOrder,
    #[serde(default)]
    pub include: Option<Value>,
    #[serde(default)]
    pub exclude: Option<Value>,
    #[serde(default)]
    pub min_doc_count: Option<u64>,
}

impl TermBucket {
    pub fn new<F: Into<String>>(field: F) -> Self {
        TermBucket {
            field: field.into(),
            size: 0,
            sort_order: TermSortOrder::default(),
            include: None,
            exclude: None,
            min_doc_count: None,
        }
    }

    /// Bucket count sent to the backend.
    ///
    /// A manual ordering over an explicit include list asks for exactly that many.
    pub fn effective_size(&self) -> usize {
        if self.sort_order == TermSortOrder::Manual
            && let Some(Value::Array(values)) = &self.include
        {
            return clamp_bucket_size(values.len());
        }
        clamp_bucket_size(self.size)
    }
}

/// Explicit histogram range, extending it past the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedBounds {
    pub min: Value,
    pub max: Value,
}

fn default_interval() -> f64 {
    1.0
}

/// Numeric histogram aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
    pub field: String,
    #[serde(default = "default_interval")]
    pub interval: f64,
    #[serde(default)]
    pub min_doc_count: u64,
    #[serde(default)]
    pub extended_bounds: Option<ExtendedBounds>,
}

fn default_date_interval() -> String {
    "1d".to_string()
}

/// Date histogram aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateHistogramBucket {
    pub field: String,
    #[serde(default = "default_date_interval")]
    pub interval: String,
    #[serde(default)]
    pub min_doc_count: u64,
    #[serde(default)]
    pub extended_bounds: Option<ExtendedBounds>,
}

/// Significance heuristic of a significant terms aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignificanceAlgorithm {
    #[default]
    Gnd,
    ChiSquare,
    Jlh,
    Percentage,
}

impl SignificanceAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignificanceAlgorithm::Gnd => "gnd",
            SignificanceAlgorithm::ChiSquare => "chi_square",
            SignificanceAlgorithm::Jlh => "jlh",
            SignificanceAlgorithm::Percentage => "percentage",
        }
    }
}

fn default_significant_size() -> usize {
    10
}

fn default_significant_min_doc_count() -> u64 {
    5
}

/// Significant terms aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificantTermBucket {
    pub field: String,
    #[serde(default = "default_significant_size")]
    pub size: usize,
    #[serde(default = "default_significant_min_doc_count")]
    pub min_doc_count: u64,
    #[serde(default)]
    pub algorithm: SignificanceAlgorithm,
}

impl SignificantTermBucket {
    pub fn new<F: Into<String>>(field: F) -> Self {
        SignificantTermBucket {
            field: field.into(),
            size: default_significant_size(),
            min_doc_count: default_significant_min_doc_count(),
            algorithm: SignificanceAlgorithm::default(),
        }
    }
}

fn default_metric_type() -> String {
    "stats".to_string()
}

/// A single-value or multi-value metric used as a top-level aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricBucket {
    pub field: String,
    #[serde(default = "default_metric_type")]
    pub metric_type: String,
    #[serde(default)]
    pub config: serde_json::Map<String, Value>,
}

fn default_top_hits_size() -> usize {
    1
}

/// Best matching documents per parent bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct TopHitsBucket {
    pub field: Option<String>,
    pub source_fields: Vec<String>,
    pub size: usize,
    pub sort: Vec<SortOrder>,
}

impl Default for TopHitsBucket {
    fn default() -> Self {
        TopHitsBucket {
            field: None,
            source_fields: Vec::new(),
            size: default_top_hits_size(),
            sort: Vec::new(),
        }
    }
}

/// Groups documents by named queries instead of by field value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryGroupBucket {
    pub queries: Vec<(String, Query)>,
}

impl QueryGroupBucket {
    pub fn query<N: Into<String>, Q: Into<Query>>(mut self, name: N, query: Q) -> Self {
        self.queries.push((name.into(), query.into()));
        self
    }
}

/// Variant-specific part of a bucket.
#[derive(Debug, Clone, PartialEq)]
pub enum BucketKind {
    Term(TermBucket),
    Histogram(HistogramBucket),
    DateHistogram(DateHistogramBucket),
    SignificantTerm(SignificantTermBucket),
    Metric(MetricBucket),
    TopHits(TopHitsBucket),
    QueryGroup(QueryGroupBucket),
}

impl BucketKind {
    pub fn bucket_type(&self) -> BucketType {
        match self {
            BucketKind::Term(_) => BucketType::Term,
            BucketKind::Histogram(_) => BucketType::Histogram,
            BucketKind::DateHistogram(_) => BucketType::DateHistogram,
            BucketKind::SignificantTerm(_) => BucketType::SignificantTerm,
            BucketKind::Metric(_) => BucketType::Metric,
            BucketKind::TopHits(_) => BucketType::TopHits,
            BucketKind::QueryGroup(_) => BucketType::QueryGroup,
        }
    }
}

/// A bucket aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub name: String,
    pub kind: BucketKind,
    pub metrics: Vec<Metric>,
    pub child_buckets: Vec<Bucket>,
    pub pipelines: Vec<Pipeline>,
    pub nested_path: Option<String>,
    /// Restricts which nested documents are aggregated.
    pub nested_filter: Option<Query>,
    /// Restricts which documents are aggregated.
    pub filter: Option<Query>,
}

impl Bucket {
    pub fn new<N: Into<String>>(name: N, kind: BucketKind) -> Self {
        Bucket {
            name: name.into(),
            kind,
            metrics: Vec::new(),
            child_buckets: Vec::new(),
            pipelines: Vec::new(),
            nested_path: None,
            nested_filter: None,
            filter: None,
        }
    }

    pub fn bucket_type(&self) -> BucketType {
        self.kind.bucket_type()
    }

    pub fn is_nested(&self) -> bool {
        self.nested_path.is_some()
    }

    /// The aggregated field.
    ///
    /// Query groups have no field; asking for one is an error.
    pub fn field(&self) -> Result<&str> {
        match &self.kind {
            BucketKind::Term(b) => Ok(&b.field),
            BucketKind::Histogram(b) => Ok(&b.field),
            BucketKind::DateHistogram(b) => Ok(&b.field),
            BucketKind::SignificantTerm(b) => Ok(&b.field),
            BucketKind::Metric(b) => Ok(&b.field),
            BucketKind::TopHits(b) => b.field.as_deref().ok_or(HalberdError::UnsupportedAccessor {
                bucket: BucketType::TopHits,
                accessor: "field",
            }),
            BucketKind::QueryGroup(_) => Err(HalberdError::UnsupportedAccessor {
                bucket: BucketType::QueryGroup,
                accessor: "field",
            }),
        }
    }

    pub fn metric(mut self, metric: Metric) -> Self {
        self.metrics.push(metric);
        self
    }

    pub fn child(mut self, child: Bucket) -> Self {
        self.child_buckets.push(child);
        self
    }

    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipelines.push(pipeline);
        self
    }

    /// Aggregate nested documents under `path`.
    pub fn nested<P: Into<String>>(mut self, path: P) -> Self {
        self.nested_path = Some(path.into());
        self
    }

    pub fn nested_filter<Q: Into<Query>>(mut self, filter: Q) -> Self {
        self.nested_filter = Some(filter.into());
        self
    }

    pub fn filter<Q: Into<Query>>(mut self, filter: Q) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::query::TermQuery;

    #[test]
    fn test_clamp_bucket_size() {
        assert_eq!(clamp_bucket_size(0), MAX_BUCKET_SIZE);
        assert_eq!(clamp_bucket_size(25), 25);
        assert_eq!(clamp_bucket_size(MAX_BUCKET_SIZE), MAX_BUCKET_SIZE);
        assert_eq!(clamp_bucket_size(MAX_BUCKET_SIZE + 1), MAX_BUCKET_SIZE);
    }

    #[test]
    fn test_clamp_top_hits_size() {
        assert_eq!(clamp_top_hits_size(0), 1);
        assert_eq!(clamp_top_hits_size(5), 5);
        assert_eq!(clamp_top_hits_size(MAX_BUCKET_SIZE), MAX_TOP_HITS_SIZE);
    }

    #[test]
    fn test_query_group_has_no_field() {
        let bucket = Bucket::new(
            "price_ranges",
            BucketKind::QueryGroup(
                QueryGroupBucket::default().query("cheap", TermQuery::new("price_band", "low")),
            ),
        );

        let err = bucket.field().unwrap_err();
        assert!(err.is_contract_violation());
        assert_eq!(
            err.to_string(),
            "Bucket type query_group does not support field"
        );
    }

    #[test]
    fn test_term_bucket_from_fragment() {
        let term: TermBucket = serde_json::from_value(json!({
            "type": "term",
            "field": "color",
            "sort_order": "relevance",
            "min_doc_count": 2
        }))
        .unwrap();

        assert_eq!(term.sort_order, TermSortOrder::Relevance);
        assert_eq!(term.effective_size(), MAX_BUCKET_SIZE);
        assert_eq!(term.min_doc_count, Some(2));
    }

    #[test]
    fn test_manual_order_sizes_to_include_list() {
        let mut term = TermBucket::new("size");
        term.sort_order = TermSortOrder::Manual;
        term.include = Some(json!(["S", "M", "L"]));
        assert_eq!(term.effective_size(), 3);
    }

    #[test]
    fn test_significant_term_defaults() {
        let bucket: SignificantTermBucket =
            serde_json::from_value(json!({"field": "tags"})).unwrap();
        assert_eq!(bucket.min_doc_count, 5);
        assert_eq!(bucket.algorithm, SignificanceAlgorithm::Gnd);
    }

    #[test]
    fn test_nested_bucket() {
        let bucket = Bucket::new("seller", BucketKind::Term(TermBucket::new("offers.seller")))
            .nested("offers")
            .nested_filter(TermQuery::new("offers.in_stock", true));

        assert!(bucket.is_nested());
        assert_eq!(bucket.field().unwrap(), "offers.seller");
        assert_eq!(bucket.bucket_type(), BucketType::Term);
    }
}
