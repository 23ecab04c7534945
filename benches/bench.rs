//! Criterion benchmarks for the Halberd request compiler.
//!
//! Covers the stages of the pipeline separately:
//! - Binding and dereferencing a fragment store
//! - Compiling a resolved request
//! - Fulltext query assembly

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use halberd::config::CompilerConfig;
use halberd::dsl::QueryCompiler;
use halberd::fragment::{FragmentStore, Parameters};
use halberd::fulltext::{
    ContainerConfiguration, FulltextQueryBuilder, QueryText, RelevanceConfig, SpellingType,
};
use halberd::mapping::{Analyzer, Field, Mapping};
use halberd::request::{RequestCompiler, ResolvedRequest, SearchRequest};
use serde_json::{Value, json};

/// A store with `count` filters all referenced by the root filter.
fn generate_store(count: usize) -> FragmentStore {
    let mut filters = serde_json::Map::new();
    let mut must = Vec::with_capacity(count);
    for i in 0..count {
        let name = format!("facet_{i}");
        filters.insert(
            name.clone(),
            json!({"type": "terms", "field": format!("attr_{i}"), "values": format!("$p{i}$")}),
        );
        must.push(json!({"reference": name}));
    }
    filters.insert("all".to_string(), json!({"type": "bool", "must": must}));

    serde_json::from_value(json!({
        "root_query": "main",
        "root_filter": "all",
        "queries": {"main": {"type": "match", "field": "name", "query": "$q$"}},
        "filters": filters,
        "aggregations": {
            "brands": {"type": "term", "field": "brand", "size": 20},
            "prices": {"type": "histogram", "field": "price", "interval": 10}
        },
        "sort_orders": {"price": {"field": "price", "direction": "asc"}}
    }))
    .unwrap_or_default()
}

fn generate_parameters(count: usize) -> Parameters {
    let mut parameters = Parameters::new().with("q", json!("running shoes"));
    for i in 0..count {
        // Leave every third facet unbound so binding drops it.
        if i % 3 != 0 {
            parameters.set(format!("p{i}"), json!(["a", "b", "c"]));
        }
    }
    parameters
}

fn catalog_container() -> ContainerConfiguration {
    let mapping = Mapping::new(vec![
        Field::text("name", &[Analyzer::Shingle, Analyzer::Whitespace, Analyzer::Phonetic])
            .searchable(5.0)
            .spellcheck(),
        Field::text("description", &[Analyzer::Whitespace]).searchable(1.0),
    ]);
    ContainerConfiguration::new("catalog", Arc::new(mapping), RelevanceConfig::default())
}

/// Benchmark binding and dereferencing.
fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");

    for size in [10, 100] {
        let store = generate_store(size);
        let parameters = generate_parameters(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("resolve_{size}_filters"), |b| {
            b.iter(|| black_box(ResolvedRequest::resolve(black_box(&store), &parameters)))
        });
    }

    group.finish();
}

/// Benchmark the whole request pipeline.
fn bench_request_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_compile");
    let compiler = RequestCompiler::new();

    for size in [10, 100] {
        let request =
            SearchRequest::new(generate_store(size)).with_parameters(generate_parameters(size));
        group.bench_function(format!("compile_{size}_filters"), |b| {
            b.iter(|| {
                let document: Value = compiler.compile_request(black_box(&request)).unwrap_or_default();
                black_box(document)
            })
        });
    }

    group.finish();
}

/// Benchmark fulltext assembly and compilation.
fn bench_fulltext(c: &mut Criterion) {
    let mut group = c.benchmark_group("fulltext");
    let container = catalog_container();
    let builder = FulltextQueryBuilder::new(CompilerConfig::default());
    let compiler = QueryCompiler::new();
    let text = QueryText::from("red running shoes");

    for spelling_type in [SpellingType::Exact, SpellingType::Fuzzy, SpellingType::PureStopwords] {
        group.bench_function(format!("assemble_{spelling_type}"), |b| {
            b.iter(|| {
                let query = builder.create(&container, black_box(&text), spelling_type, 1.0);
                black_box(query.and_then(|query| compiler.compile(&query)).ok())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolution, bench_request_compile, bench_fulltext);

criterion_main!(benches);
