use std::sync::Arc;

use halberd::config::CompilerConfig;
use halberd::dsl::QueryCompiler;
use halberd::error::Result;
use halberd::fulltext::{
    ContainerConfiguration, FulltextQueryBuilder, QueryText, RelevanceConfig, SpellingType,
    Spellchecker, StopwordSpellchecker, SynonymRewriter, expand_query_text,
};
use halberd::mapping::Mapping;
use halberd::request::{RequestCompiler, SearchRequest};
use serde_json::json;

const CATALOG_MAPPING: &str = r#"{
    "fields": [
        {
            "name": "name",
            "field_type": "text",
            "is_searchable": true,
            "search_weight": 5.0,
            "is_used_in_spellcheck": true,
            "analyzers": ["whitespace", "shingle"]
        },
        {
            "name": "description",
            "field_type": "text",
            "is_searchable": true,
            "analyzers": ["whitespace"]
        },
        {"name": "price", "field_type": "double"}
    ]
}"#;

fn container(relevance: RelevanceConfig) -> Result<ContainerConfiguration> {
    let mapping = Mapping::from_json_str(CATALOG_MAPPING)?;
    Ok(ContainerConfiguration::new("catalog", Arc::new(mapping), relevance))
}

fn builder() -> FulltextQueryBuilder {
    FulltextQueryBuilder::new(CompilerConfig::default())
}

#[test]
fn test_pure_stopwords_compile() -> Result<()> {
    let container = container(RelevanceConfig::default())?;
    let text = "the";
    let spelling_type = StopwordSpellchecker::new().spelling_type(text);
    assert_eq!(spelling_type, SpellingType::PureStopwords);

    let query = builder().create(&container, &QueryText::from(text), spelling_type, 1.0)?;
    let compiled = QueryCompiler::new().compile(&query)?;

    let multi_match = &compiled["multi_match"];
    assert_eq!(multi_match["_name"], json!("PURE_STOPWORDS"));
    assert_eq!(multi_match["minimum_should_match"], json!("100%"));
    assert_eq!(multi_match["query"], json!("the"));
    assert!(multi_match["fields"].as_array().is_some_and(|f| !f.is_empty()));
    Ok(())
}

#[test]
fn test_exact_query_compiles_to_filtered_bool() -> Result<()> {
    let container = container(RelevanceConfig::default())?;
    let query = builder().create(
        &container,
        &QueryText::from("red shoes"),
        SpellingType::Exact,
        2.0,
    )?;
    let compiled = QueryCompiler::new().compile(&query)?;

    let exact = &compiled["bool"];
    assert_eq!(exact["_name"], json!("EXACT"));
    assert_eq!(exact["boost"], json!(2.0));
    assert_eq!(exact["must"].as_array().map(Vec::len), Some(1));
    assert_eq!(exact["filter"]["multi_match"]["cutoff_frequency"], json!(0.15));
    assert_eq!(exact["must"][0]["multi_match"]["minimum_should_match"], json!(1));
    assert_eq!(exact["filter"]["multi_match"]["minimum_should_match"], json!("100%"));
    Ok(())
}

#[test]
fn test_span_boost_wraps_exact_query() -> Result<()> {
    let relevance =
        RelevanceConfig::from_json_str(r#"{"span": {"span_match_boost": 2.0, "span_size": 3}}"#)?;
    let container = container(relevance)?;
    let query = builder().create(
        &container,
        &QueryText::from("Red Shoes"),
        SpellingType::Exact,
        1.0,
    )?;
    let compiled = QueryCompiler::new().compile(&query)?;

    let wrapper = &compiled["bool"];
    assert_eq!(wrapper["minimum_should_match"], json!(0));
    assert_eq!(wrapper["must"][0]["bool"]["_name"], json!("EXACT"));

    let span_first = &wrapper["should"][0]["span_first"];
    assert_eq!(span_first["end"], json!(2));
    assert_eq!(span_first["boost"], json!(10.0));
    let clauses = &span_first["match"]["span_near"]["clauses"];
    assert_eq!(
        clauses[0],
        json!({"span_term": {"name": {"value": "red", "boost": 1.0}}})
    );
    assert_eq!(clauses.as_array().map(Vec::len), Some(2));
    Ok(())
}

#[test]
fn test_synonyms_become_weighted_alternatives() -> Result<()> {
    let container = container(RelevanceConfig::default())?;
    let rewriter = SynonymRewriter::new().synonym_group(["sneakers", "trainers"]);
    let query_text = expand_query_text(&rewriter, "sneakers");

    let query = builder().create(&container, &query_text, SpellingType::Exact, 3.0)?;
    let compiled = QueryCompiler::new().compile(&query)?;

    let alternatives = &compiled["bool"];
    assert_eq!(alternatives["boost"], json!(3.0));
    assert_eq!(alternatives["should"].as_array().map(Vec::len), Some(2));
    assert_eq!(alternatives["should"][0]["bool"]["boost"], json!(1.0));
    assert_eq!(alternatives["should"][1]["bool"]["boost"], json!(0.5));
    assert_eq!(
        alternatives["should"][1]["bool"]["must"][0]["multi_match"]["query"],
        json!("trainers")
    );
    Ok(())
}

#[test]
fn test_fulltext_query_joins_request() -> Result<()> {
    let container = container(RelevanceConfig::default())?;
    let fulltext = builder().create(
        &container,
        &QueryText::from("the"),
        SpellingType::PureStopwords,
        1.0,
    )?;

    let store = serde_json::from_value(json!({
        "root_query": "in_stock",
        "queries": {"in_stock": {"type": "range", "field": "stock", "gt": 0}}
    }))?;
    let request = SearchRequest::new(store).with_query(fulltext);
    let document = RequestCompiler::new().compile_request(&request)?;

    let must = &document["query"]["bool"]["must"];
    assert!(must[0].get("range").is_some());
    assert_eq!(must[1]["multi_match"]["_name"], json!("PURE_STOPWORDS"));
    Ok(())
}
