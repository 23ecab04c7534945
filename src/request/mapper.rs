//! Mapping of dereferenced fragments onto the typed model.
//!
//! Leaves deserialize field-for-field with serde. Composites are assembled by
//! hand so that a child which fails to build can be dropped instead of failing
//! the whole tree. Nothing here returns an error: a fragment that cannot be
//! built yields `None` and a log line.

use std::str::FromStr;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::aggregation::{Bucket, BucketKind, BucketType, Metric, Pipeline, QueryGroupBucket};
use crate::aggregation::{TopHitsBucket, clamp_top_hits_size};
use crate::fragment::{Fragment, FragmentMap, FragmentValue, TYPE_KEY};
use crate::query::{
    BoolQuery, FilteredQuery, FunctionFilter, FunctionScoreQuery, NestedQuery, NotQuery, Query,
    QueryType, RangeBounds, RangeQuery, ScoreFunction, SpanContainingQuery,
    SpanFieldMaskingQuery, SpanFirstQuery, SpanMultiTermQuery, SpanNearQuery, SpanNotQuery,
    SpanOrQuery, SpanQuery, SpanTermQuery, SpanWithinQuery,
};
use crate::sort::{NestedSortOrder, SortOrder, StandardSortOrder};

const NAME_KEY: &str = "name";
const BOOST_KEY: &str = "boost";

fn deserialize<T: DeserializeOwned>(kind: &str, fragment: &Fragment) -> Option<T> {
    match serde_json::from_value(fragment.to_json()) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("malformed {kind} fragment, pruning: {e}");
            None
        }
    }
}

fn deserialize_value<T: DeserializeOwned>(key: &str, value: &FragmentValue) -> Option<T> {
    match serde_json::from_value(value.to_json()) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("ignoring malformed {key}: {e}");
            None
        }
    }
}

fn as_fragment(value: &FragmentValue) -> Option<Fragment> {
    value.as_map().map(|map| Fragment::new(map.clone()))
}

fn string(fragment: &Fragment, key: &str) -> Option<String> {
    match fragment.get(key)? {
        FragmentValue::String(s) => Some(s.clone()),
        FragmentValue::Number(n) => Some(n.to_string()),
        FragmentValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn number(fragment: &Fragment, key: &str) -> Option<f64> {
    match fragment.get(key)? {
        FragmentValue::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn unsigned(fragment: &Fragment, key: &str) -> Option<u32> {
    match fragment.get(key)? {
        FragmentValue::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        _ => None,
    }
}

fn boolean(fragment: &Fragment, key: &str) -> Option<bool> {
    match fragment.get(key)? {
        FragmentValue::Bool(b) => Some(*b),
        _ => None,
    }
}

/// Entries of a slot given either as a list or as a name-keyed map.
///
/// Map keys become the entry name unless the entry carries its own.
fn named_entries(value: Option<&FragmentValue>) -> Vec<Fragment> {
    match value {
        Some(FragmentValue::List(items)) => items.iter().filter_map(as_fragment).collect(),
        Some(FragmentValue::Map(named)) => named
            .iter()
            .filter_map(|(name, entry)| {
                let mut body = entry.as_map()?.clone();
                body.entry(NAME_KEY.to_string())
                    .or_insert_with(|| FragmentValue::String(name.clone()));
                Some(Fragment::new(body))
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn with_common(mut query: Query, fragment: &Fragment) -> Query {
    if let Some(name) = string(fragment, NAME_KEY) {
        query.set_name(name);
    }
    if let Some(boost) = number(fragment, BOOST_KEY) {
        query.set_boost(boost);
    }
    query
}

/// Build a query from a dereferenced fragment.
pub fn build_query(fragment: &Fragment) -> Option<Query> {
    let Some(kind) = fragment.kind() else {
        warn!("query fragment without a type, pruning");
        return None;
    };
    let query_type = match QueryType::from_str(kind) {
        Ok(query_type) => query_type,
        Err(e) => {
            warn!("{e}, pruning");
            return None;
        }
    };

    let query = match query_type {
        QueryType::Term => Query::Term(deserialize(kind, fragment)?),
        QueryType::Terms => Query::Terms(deserialize(kind, fragment)?),
        QueryType::Range => Query::Range(build_range(fragment)?),
        QueryType::Match => Query::Match(deserialize(kind, fragment)?),
        QueryType::MultiMatch => Query::MultiMatch(deserialize(kind, fragment)?),
        QueryType::Common => Query::Common(deserialize(kind, fragment)?),
        QueryType::Prefix => Query::Prefix(deserialize(kind, fragment)?),
        QueryType::Regexp => Query::Regexp(deserialize(kind, fragment)?),
        QueryType::Exists => Query::Exists(deserialize(kind, fragment)?),
        QueryType::MoreLikeThis => Query::MoreLikeThis(deserialize(kind, fragment)?),
        QueryType::Bool => return Some(build_bool(fragment)),
        QueryType::Filtered => build_filtered(fragment)?,
        QueryType::Nested => build_nested(fragment)?,
        QueryType::Not => build_not(fragment)?,
        QueryType::FunctionScore => build_function_score(fragment),
        _ => return build_span(fragment).map(Query::Span),
    };
    Some(with_common(query, fragment))
}

fn build_child(fragment: &Fragment, key: &str) -> Option<Query> {
    fragment.get(key).and_then(as_fragment).as_ref().and_then(build_query)
}

/// Bounds may sit under `bounds` or directly on the fragment.
fn build_range(fragment: &Fragment) -> Option<RangeQuery> {
    let mut range: RangeQuery = deserialize("range", fragment)?;
    if range.bounds.is_unbounded() {
        if let Ok(bounds) = serde_json::from_value::<RangeBounds>(fragment.to_json()) {
            range.bounds = bounds;
        }
    }
    Some(range)
}

fn build_clauses(value: Option<&FragmentValue>) -> Vec<Query> {
    match value {
        Some(FragmentValue::List(items)) => items
            .iter()
            .filter_map(as_fragment)
            .filter_map(|child| build_query(&child))
            .collect(),
        Some(single @ FragmentValue::Map(_)) => as_fragment(single)
            .as_ref()
            .and_then(build_query)
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}

/// Always builds, possibly with no clauses at all.
fn build_bool(fragment: &Fragment) -> Query {
    let mut bool_query = BoolQuery::new();
    bool_query.must = build_clauses(fragment.get("must"));
    bool_query.should = build_clauses(fragment.get("should"));
    bool_query.must_not = build_clauses(fragment.get("must_not"));
    if let Some(msm) = fragment.get("minimum_should_match") {
        if let Some(msm) = deserialize_value("minimum_should_match", msm) {
            bool_query.minimum_should_match = msm;
        }
    }
    with_common(bool_query.into(), fragment)
}

fn build_filtered(fragment: &Fragment) -> Option<Query> {
    let filtered = FilteredQuery::new(build_child(fragment, "query"), build_child(fragment, "filter"));
    if filtered.is_none() {
        debug!("filtered fragment has neither query nor filter, pruning");
    }
    filtered.map(Query::from)
}

fn build_nested(fragment: &Fragment) -> Option<Query> {
    let Some(path) = string(fragment, "path") else {
        warn!("nested fragment without a path, pruning");
        return None;
    };
    let query = build_child(fragment, "query")?;
    let mut nested = NestedQuery::new(path, query);
    if let Some(mode) = fragment.get("score_mode") {
        if let Some(mode) = deserialize_value("score_mode", mode) {
            nested.score_mode = mode;
        }
    }
    Some(nested.into())
}

fn build_not(fragment: &Fragment) -> Option<Query> {
    build_child(fragment, "query").map(|query| NotQuery::new(query).into())
}

fn build_function(function: &FragmentMap) -> Option<ScoreFunction> {
    let mut body: Map<String, Value> = Map::new();
    let mut score_function = ScoreFunction::default();
    for (key, value) in function {
        match key.as_str() {
            "filter" => {
                let filter = value.as_map()?;
                if filter.contains_key(TYPE_KEY) {
                    let query = build_query(&Fragment::new(filter.clone()))?;
                    score_function.filter = Some(FunctionFilter::Query(Box::new(query)));
                } else {
                    score_function.filter = Some(FunctionFilter::Compiled(value.to_json()));
                }
            }
            "weight" => {
                score_function.weight = match value {
                    FragmentValue::Number(n) => n.as_f64(),
                    _ => None,
                };
            }
            _ => {
                body.insert(key.clone(), value.to_json());
            }
        }
    }
    score_function.body = body;
    Some(score_function)
}

fn build_function_score(fragment: &Fragment) -> Query {
    let mut function_score = FunctionScoreQuery::new(build_child(fragment, "query"));
    let functions: Vec<&FragmentMap> = match fragment.get("functions") {
        Some(FragmentValue::List(items)) => items.iter().filter_map(FragmentValue::as_map).collect(),
        Some(FragmentValue::Map(named)) => named.values().filter_map(FragmentValue::as_map).collect(),
        _ => Vec::new(),
    };
    for function in functions {
        match build_function(function) {
            Some(function) => function_score.functions.push(function),
            None => debug!("dropping score function whose filter did not build"),
        }
    }
    if let Some(mode) = fragment.get("score_mode") {
        if let Some(mode) = deserialize_value("score_mode", mode) {
            function_score.score_mode = mode;
        }
    }
    if let Some(mode) = fragment.get("boost_mode") {
        if let Some(mode) = deserialize_value("boost_mode", mode) {
            function_score.boost_mode = mode;
        }
    }
    function_score.into()
}

fn build_span_child(fragment: &Fragment, key: &str) -> Option<SpanQuery> {
    fragment.get(key).and_then(as_fragment).as_ref().and_then(build_span)
}

fn build_span_clauses(fragment: &Fragment) -> Option<Vec<SpanQuery>> {
    let clauses: Vec<SpanQuery> = fragment
        .get("clauses")
        .and_then(FragmentValue::as_list)
        .unwrap_or_default()
        .iter()
        .filter_map(as_fragment)
        .filter_map(|clause| build_span(&clause))
        .collect();
    if clauses.is_empty() {
        debug!("span fragment without clauses, pruning");
        None
    } else {
        Some(clauses)
    }
}

/// Build a span query from a dereferenced fragment.
pub fn build_span(fragment: &Fragment) -> Option<SpanQuery> {
    let kind = fragment.kind()?;
    let query_type = QueryType::from_str(kind).ok().filter(QueryType::is_span);
    let Some(query_type) = query_type else {
        warn!("{kind} is not a span query type, pruning");
        return None;
    };

    let mut span: SpanQuery = match query_type {
        QueryType::SpanTerm => {
            SpanTermQuery::new(string(fragment, "field")?, string(fragment, "value")?).into()
        }
        QueryType::SpanFirst => {
            let end = unsigned(fragment, "end")?;
            SpanFirstQuery::new(build_span_child(fragment, "match")?, end).into()
        }
        QueryType::SpanNear => SpanNearQuery::new(
            build_span_clauses(fragment)?,
            unsigned(fragment, "slop").unwrap_or(0),
            boolean(fragment, "in_order").unwrap_or(true),
        )
        .into(),
        QueryType::SpanOr => SpanOrQuery::new(build_span_clauses(fragment)?).into(),
        QueryType::SpanNot => {
            let mut not = SpanNotQuery::new(
                build_span_child(fragment, "include")?,
                build_span_child(fragment, "exclude")?,
            );
            not.pre = unsigned(fragment, "pre");
            not.post = unsigned(fragment, "post");
            not.into()
        }
        QueryType::SpanContaining => SpanContainingQuery::new(
            build_span_child(fragment, "big")?,
            build_span_child(fragment, "little")?,
        )
        .into(),
        QueryType::SpanWithin => SpanWithinQuery::new(
            build_span_child(fragment, "big")?,
            build_span_child(fragment, "little")?,
        )
        .into(),
        QueryType::SpanFieldMasking => SpanFieldMaskingQuery::new(
            build_span_child(fragment, "query")?,
            string(fragment, "field")?,
        )
        .into(),
        QueryType::SpanMultiTerm => match SpanMultiTermQuery::new(build_child(fragment, "match")?)
        {
            Ok(multi) => multi.into(),
            Err(e) => {
                warn!("{e}, pruning");
                return None;
            }
        },
        _ => return None,
    };

    if let Some(name) = string(fragment, NAME_KEY) {
        span.set_name(name);
    }
    if let Some(boost) = number(fragment, BOOST_KEY) {
        span.set_boost(boost);
    }
    Some(span)
}

/// Build a sort order. `type` is `standard` (the default) or `nested`.
///
/// A nested sort order whose filter does not build is dropped.
pub fn build_sort_order(fragment: &Fragment) -> Option<SortOrder> {
    match fragment.kind().unwrap_or("standard") {
        "standard" => deserialize::<StandardSortOrder>("sort order", fragment).map(SortOrder::from),
        "nested" => {
            let field = string(fragment, "field")?;
            let Some(path) = string(fragment, "nested_path") else {
                warn!("nested sort order on {field} without a path, pruning");
                return None;
            };
            let direction = match fragment.get("direction") {
                Some(direction) => deserialize_value("direction", direction)?,
                None => Default::default(),
            };
            let mut order = NestedSortOrder::new(field, direction, path);
            order.missing = fragment.get("missing").map(FragmentValue::to_json);
            order.name = string(fragment, NAME_KEY);
            if let Some(mode) = fragment.get("score_mode").or_else(|| fragment.get("mode")) {
                order.score_mode = deserialize_value("score_mode", mode)?;
            }
            if fragment.contains("nested_filter") {
                order.nested_filter = Some(build_child(fragment, "nested_filter")?);
            }
            Some(order.into())
        }
        other => {
            warn!("unknown sort order type {other}, pruning");
            None
        }
    }
}

fn build_bucket_kind(bucket_type: BucketType, fragment: &Fragment) -> Option<BucketKind> {
    let kind = bucket_type.as_str();
    let bucket_kind = match bucket_type {
        BucketType::Term => BucketKind::Term(deserialize(kind, fragment)?),
        BucketType::Histogram => BucketKind::Histogram(deserialize(kind, fragment)?),
        BucketType::DateHistogram => BucketKind::DateHistogram(deserialize(kind, fragment)?),
        BucketType::SignificantTerm => BucketKind::SignificantTerm(deserialize(kind, fragment)?),
        BucketType::Metric => BucketKind::Metric(deserialize(kind, fragment)?),
        BucketType::TopHits => {
            let mut top_hits = TopHitsBucket {
                field: string(fragment, "field"),
                ..Default::default()
            };
            if let Some(fields) = fragment.get("source_fields") {
                top_hits.source_fields = deserialize_value("source_fields", fields)?;
            }
            if let Some(size) = unsigned(fragment, "size") {
                top_hits.size = clamp_top_hits_size(size as usize);
            }
            top_hits.sort = named_entries(fragment.get("sort"))
                .iter()
                .filter_map(build_sort_order)
                .collect();
            BucketKind::TopHits(top_hits)
        }
        BucketType::QueryGroup => {
            let entries: Vec<(String, Fragment)> = match fragment.get("queries") {
                Some(FragmentValue::Map(named)) => named
                    .iter()
                    .filter_map(|(name, entry)| Some((name.clone(), as_fragment(entry)?)))
                    .collect(),
                Some(FragmentValue::List(items)) => items
                    .iter()
                    .filter_map(as_fragment)
                    .enumerate()
                    .map(|(position, entry)| {
                        let name =
                            string(&entry, NAME_KEY).unwrap_or_else(|| format!("query_{position}"));
                        (name, entry)
                    })
                    .collect(),
                _ => Vec::new(),
            };
            let mut group = QueryGroupBucket::default();
            for (name, entry) in entries {
                match build_query(&entry) {
                    Some(query) => group.queries.push((name, query)),
                    None => debug!("skipping query group entry {name}"),
                }
            }
            if group.queries.is_empty() {
                warn!("query group without queries, pruning");
                return None;
            }
            BucketKind::QueryGroup(group)
        }
    };
    Some(bucket_kind)
}

/// Build a bucket. `name` is used when the fragment carries none.
///
/// A bucket whose filter or nested filter does not build is dropped, as are
/// child buckets that do not build.
pub fn build_bucket(name: &str, fragment: &Fragment) -> Option<Bucket> {
    let kind = fragment.kind().unwrap_or(BucketType::Term.as_str());
    let bucket_type = match BucketType::from_str(kind) {
        Ok(bucket_type) => bucket_type,
        Err(e) => {
            warn!("{e}, pruning aggregation {name}");
            return None;
        }
    };
    let name = string(fragment, NAME_KEY).unwrap_or_else(|| name.to_string());
    let mut bucket = Bucket::new(name, build_bucket_kind(bucket_type, fragment)?);

    bucket.metrics = named_entries(fragment.get("metrics"))
        .iter()
        .filter_map(|metric| deserialize::<Metric>("metric", metric))
        .collect();
    bucket.pipelines = named_entries(fragment.get("pipelines"))
        .iter()
        .filter_map(|pipeline| deserialize::<Pipeline>("pipeline", pipeline))
        .collect();
    bucket.child_buckets = named_entries(fragment.get("child_buckets"))
        .iter()
        .filter_map(|child| {
            let Some(child_name) = string(child, NAME_KEY) else {
                warn!("child bucket of {} without a name, pruning", bucket.name);
                return None;
            };
            build_bucket(&child_name, child)
        })
        .collect();

    bucket.nested_path = string(fragment, "nested_path");
    if fragment.contains("nested_filter") {
        bucket.nested_filter = Some(build_child(fragment, "nested_filter")?);
    }
    if fragment.contains("filter") {
        bucket.filter = Some(build_child(fragment, "filter")?);
    }
    Some(bucket)
}
