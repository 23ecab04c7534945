//! Aggregation model: buckets, metrics and pipelines.

pub mod bucket;
pub mod metric;
pub mod pipeline;

use std::fmt;
use std::str::FromStr;

use crate::error::HalberdError;

pub use self::bucket::{
    Bucket, BucketKind, DateHistogramBucket, ExtendedBounds, HistogramBucket, MetricBucket,
    QueryGroupBucket, SignificanceAlgorithm, SignificantTermBucket, TermBucket, TermSortOrder,
    TopHitsBucket, clamp_bucket_size, clamp_top_hits_size,
};
pub use self::metric::Metric;
pub use self::pipeline::Pipeline;

/// Upper bound on the number of buckets a term aggregation may return.
pub const MAX_BUCKET_SIZE: usize = 10000;

/// Upper bound on the hits a top_hits aggregation returns per bucket.
pub const MAX_TOP_HITS_SIZE: usize = 100;

/// Variant tag of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketType {
    Term,
    Histogram,
    DateHistogram,
    SignificantTerm,
    Metric,
    TopHits,
    QueryGroup,
}

impl BucketType {
    pub const ALL: [BucketType; 7] = [
        BucketType::Term,
        BucketType::Histogram,
        BucketType::DateHistogram,
        BucketType::SignificantTerm,
        BucketType::Metric,
        BucketType::TopHits,
        BucketType::QueryGroup,
    ];

    /// Name used as the fragment `type` discriminator.
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketType::Term => "term",
            BucketType::Histogram => "histogram",
            BucketType::DateHistogram => "date_histogram",
            BucketType::SignificantTerm => "significant_term",
            BucketType::Metric => "metric",
            BucketType::TopHits => "top_hits",
            BucketType::QueryGroup => "query_group",
        }
    }
}

impl fmt::Display for BucketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BucketType {
    type Err = HalberdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BucketType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| HalberdError::config(format!("unknown bucket type: {s}")))
    }
}
