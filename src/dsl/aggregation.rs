//! Aggregation serialization.
//!
//! A bucket compiles in two steps: its assembler produces the variant body
//! (`{"terms": {...}}`), then [`AggregationCompiler`] attaches metrics,
//! pipelines and child buckets under `aggregations` and wraps the result in
//! the nested and filter aggregations the bucket asks for.

use log::trace;
use serde_json::{Map, Value, json};

use crate::aggregation::{
    Bucket, BucketKind, BucketType, ExtendedBounds, TermBucket, TermSortOrder, clamp_bucket_size,
};
use crate::dsl::{QueryCompiler, SortCompiler};
use crate::error::{HalberdError, Result};

/// Sub-aggregation carrying the best score of each term bucket.
pub const TERM_RELEVANCE_AGGREGATION: &str = "term_relevance";

/// Serializes the variant-specific body of one bucket type.
pub trait BucketAssembler {
    fn bucket_type(&self) -> BucketType;

    fn assemble(&self, bucket: &Bucket, compiler: &AggregationCompiler) -> Result<Value>;
}

fn mismatch(expected: BucketType, bucket: &Bucket) -> HalberdError {
    HalberdError::bucket_type_mismatch(expected, bucket.bucket_type())
}

fn wrap(kind: &str, params: Map<String, Value>) -> Value {
    let mut document = Map::new();
    document.insert(kind.to_string(), Value::Object(params));
    Value::Object(document)
}

fn insert_histogram_common(
    params: &mut Map<String, Value>,
    min_doc_count: u64,
    extended_bounds: Option<&ExtendedBounds>,
) {
    params.insert("min_doc_count".to_string(), json!(min_doc_count));
    if let Some(bounds) = extended_bounds {
        params.insert(
            "extended_bounds".to_string(),
            json!({"min": bounds.min, "max": bounds.max}),
        );
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TermBucketAssembler;

impl TermBucketAssembler {
    fn order(term: &TermBucket) -> Value {
        match term.sort_order {
            TermSortOrder::Count | TermSortOrder::Manual => json!({"_count": "desc"}),
            TermSortOrder::Key => json!({"_key": "asc"}),
            TermSortOrder::Relevance => {
                let mut order = Map::new();
                order.insert(TERM_RELEVANCE_AGGREGATION.to_string(), json!("desc"));
                Value::Object(order)
            }
        }
    }
}

impl BucketAssembler for TermBucketAssembler {
    fn bucket_type(&self) -> BucketType {
        BucketType::Term
    }

    fn assemble(&self, bucket: &Bucket, _compiler: &AggregationCompiler) -> Result<Value> {
        let BucketKind::Term(term) = &bucket.kind else {
            return Err(mismatch(self.bucket_type(), bucket));
        };
        let mut params = Map::new();
        params.insert("field".to_string(), json!(term.field));
        params.insert("size".to_string(), json!(term.effective_size()));
        params.insert("order".to_string(), Self::order(term));
        if let Some(include) = &term.include {
            params.insert("include".to_string(), include.clone());
        }
        if let Some(exclude) = &term.exclude {
            params.insert("exclude".to_string(), exclude.clone());
        }
        if let Some(min_doc_count) = term.min_doc_count {
            params.insert("min_doc_count".to_string(), json!(min_doc_count));
        }
        Ok(wrap("terms", params))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HistogramBucketAssembler;

impl BucketAssembler for HistogramBucketAssembler {
    fn bucket_type(&self) -> BucketType {
        BucketType::Histogram
    }

    fn assemble(&self, bucket: &Bucket, _compiler: &AggregationCompiler) -> Result<Value> {
        let BucketKind::Histogram(histogram) = &bucket.kind else {
            return Err(mismatch(self.bucket_type(), bucket));
        };
        let mut params = Map::new();
        params.insert("field".to_string(), json!(histogram.field));
        params.insert("interval".to_string(), json!(histogram.interval));
        insert_histogram_common(
            &mut params,
            histogram.min_doc_count,
            histogram.extended_bounds.as_ref(),
        );
        Ok(wrap("histogram", params))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DateHistogramBucketAssembler;

impl BucketAssembler for DateHistogramBucketAssembler {
    fn bucket_type(&self) -> BucketType {
        BucketType::DateHistogram
    }

    fn assemble(&self, bucket: &Bucket, _compiler: &AggregationCompiler) -> Result<Value> {
        let BucketKind::DateHistogram(histogram) = &bucket.kind else {
            return Err(mismatch(self.bucket_type(), bucket));
        };
        let mut params = Map::new();
        params.insert("field".to_string(), json!(histogram.field));
        params.insert("interval".to_string(), json!(histogram.interval));
        insert_histogram_common(
            &mut params,
            histogram.min_doc_count,
            histogram.extended_bounds.as_ref(),
        );
        Ok(wrap("date_histogram", params))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SignificantTermBucketAssembler;

impl BucketAssembler for SignificantTermBucketAssembler {
    fn bucket_type(&self) -> BucketType {
        BucketType::SignificantTerm
    }

    fn assemble(&self, bucket: &Bucket, _compiler: &AggregationCompiler) -> Result<Value> {
        let BucketKind::SignificantTerm(significant) = &bucket.kind else {
            return Err(mismatch(self.bucket_type(), bucket));
        };
        let mut params = Map::new();
        params.insert("field".to_string(), json!(significant.field));
        params.insert(
            "size".to_string(),
            json!(clamp_bucket_size(significant.size)),
        );
        params.insert("min_doc_count".to_string(), json!(significant.min_doc_count));
        params.insert(significant.algorithm.as_str().to_string(), json!({}));
        Ok(wrap("significant_terms", params))
    }
}

/// `{metric_type: {"field", ..config}}`
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricBucketAssembler;

impl BucketAssembler for MetricBucketAssembler {
    fn bucket_type(&self) -> BucketType {
        BucketType::Metric
    }

    fn assemble(&self, bucket: &Bucket, _compiler: &AggregationCompiler) -> Result<Value> {
        let BucketKind::Metric(metric) = &bucket.kind else {
            return Err(mismatch(self.bucket_type(), bucket));
        };
        let mut params = Map::new();
        params.insert("field".to_string(), json!(metric.field));
        for (key, value) in &metric.config {
            params.insert(key.clone(), value.clone());
        }
        Ok(wrap(&metric.metric_type, params))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TopHitsBucketAssembler;

impl BucketAssembler for TopHitsBucketAssembler {
    fn bucket_type(&self) -> BucketType {
        BucketType::TopHits
    }

    fn assemble(&self, bucket: &Bucket, compiler: &AggregationCompiler) -> Result<Value> {
        let BucketKind::TopHits(top_hits) = &bucket.kind else {
            return Err(mismatch(self.bucket_type(), bucket));
        };
        let mut params = Map::new();
        params.insert("size".to_string(), json!(top_hits.size));
        if !top_hits.source_fields.is_empty() {
            params.insert(
                "_source".to_string(),
                json!({"includes": top_hits.source_fields}),
            );
        }
        if !top_hits.sort.is_empty() {
            let sort = compiler.sorts.compile_all(&top_hits.sort)?;
            params.insert("sort".to_string(), Value::Array(sort));
        }
        Ok(wrap("top_hits", params))
    }
}

/// One `filters` entry per named child query.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryGroupBucketAssembler;

impl BucketAssembler for QueryGroupBucketAssembler {
    fn bucket_type(&self) -> BucketType {
        BucketType::QueryGroup
    }

    fn assemble(&self, bucket: &Bucket, compiler: &AggregationCompiler) -> Result<Value> {
        let BucketKind::QueryGroup(group) = &bucket.kind else {
            return Err(mismatch(self.bucket_type(), bucket));
        };
        let mut filters = Map::new();
        for (name, query) in &group.queries {
            filters.insert(name.clone(), compiler.queries.compile(query)?);
        }
        Ok(json!({"filters": {"filters": filters}}))
    }
}

/// Compiles bucket trees into named aggregation bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregationCompiler {
    queries: QueryCompiler,
    sorts: SortCompiler,
}

impl AggregationCompiler {
    pub fn new() -> Self {
        AggregationCompiler::default()
    }

    fn assemble(&self, bucket: &Bucket) -> Result<Value> {
        match bucket.kind {
            BucketKind::Term(_) => TermBucketAssembler.assemble(bucket, self),
            BucketKind::Histogram(_) => HistogramBucketAssembler.assemble(bucket, self),
            BucketKind::DateHistogram(_) => DateHistogramBucketAssembler.assemble(bucket, self),
            BucketKind::SignificantTerm(_) => {
                SignificantTermBucketAssembler.assemble(bucket, self)
            }
            BucketKind::Metric(_) => MetricBucketAssembler.assemble(bucket, self),
            BucketKind::TopHits(_) => TopHitsBucketAssembler.assemble(bucket, self),
            BucketKind::QueryGroup(_) => QueryGroupBucketAssembler.assemble(bucket, self),
        }
    }

    fn sub_aggregations(&self, bucket: &Bucket) -> Result<Map<String, Value>> {
        let mut aggregations = Map::new();
        if let BucketKind::Term(term) = &bucket.kind
            && term.sort_order == TermSortOrder::Relevance
        {
            aggregations.insert(
                TERM_RELEVANCE_AGGREGATION.to_string(),
                json!({"max": {"script": "_score"}}),
            );
        }
        for metric in &bucket.metrics {
            aggregations.insert(metric.name.clone(), metric.to_json());
        }
        for pipeline in &bucket.pipelines {
            aggregations.insert(pipeline.name.clone(), pipeline.to_json());
        }
        for child in &bucket.child_buckets {
            aggregations.insert(child.name.clone(), self.compile(child)?);
        }
        Ok(aggregations)
    }

    /// Wrap `inner` (named `name`) as the only sub-aggregation of `outer`.
    fn wrap_in(outer: Value, name: &str, inner: Value) -> Value {
        let mut wrapper = match outer {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let mut aggregations = Map::new();
        aggregations.insert(name.to_string(), inner);
        wrapper.insert("aggregations".to_string(), Value::Object(aggregations));
        Value::Object(wrapper)
    }

    /// Compile one bucket, including its sub-aggregations and wrappers.
    pub fn compile(&self, bucket: &Bucket) -> Result<Value> {
        let mut body = match self.assemble(bucket)? {
            Value::Object(map) => map,
            other => return Ok(other),
        };
        let aggregations = self.sub_aggregations(bucket)?;
        if !aggregations.is_empty() {
            body.insert("aggregations".to_string(), Value::Object(aggregations));
        }
        let mut compiled = Value::Object(body);

        if let Some(nested_filter) = &bucket.nested_filter {
            trace!("wrapping bucket {} in its nested filter", bucket.name);
            let filter = json!({"filter": self.queries.compile(nested_filter)?});
            compiled = Self::wrap_in(filter, &bucket.name, compiled);
        }
        if let Some(path) = &bucket.nested_path {
            compiled = Self::wrap_in(json!({"nested": {"path": path}}), &bucket.name, compiled);
        }
        if let Some(filter) = &bucket.filter {
            let filter = json!({"filter": self.queries.compile(filter)?});
            compiled = Self::wrap_in(filter, &bucket.name, compiled);
        }
        Ok(compiled)
    }

    /// Compile buckets into a `{name: body}` map.
    pub fn compile_all(&self, buckets: &[Bucket]) -> Result<Map<String, Value>> {
        let mut aggregations = Map::new();
        for bucket in buckets {
            aggregations.insert(bucket.name.clone(), self.compile(bucket)?);
        }
        Ok(aggregations)
    }
}
