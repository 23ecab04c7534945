//! Assemblers for ordinary (non-span) query variants.

use serde_json::{Map, Value, json};

use crate::dsl::{QueryAssembler, QueryCompiler, insert_common, mismatch};
use crate::error::Result;
use crate::query::{FunctionFilter, FuzzinessConfig, Query, QueryType, ScoreFunction};

fn single_field(field: &str, params: Map<String, Value>) -> Value {
    let mut by_field = Map::new();
    by_field.insert(field.to_string(), Value::Object(params));
    Value::Object(by_field)
}

fn insert_fuzziness(params: &mut Map<String, Value>, fuzziness: Option<&FuzzinessConfig>) {
    if let Some(fuzziness) = fuzziness {
        params.insert("fuzziness".to_string(), json!(fuzziness.value));
        params.insert("prefix_length".to_string(), json!(fuzziness.prefix_length));
        params.insert("max_expansions".to_string(), json!(fuzziness.max_expansions));
    }
}

/// `{"term": {field: {"value", "boost"}}}`
#[derive(Debug, Clone, Copy, Default)]
pub struct TermAssembler;

impl QueryAssembler for TermAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::Term
    }

    fn assemble(&self, query: &Query, _compiler: &QueryCompiler) -> Result<Value> {
        let Query::Term(term) = query else {
            return Err(mismatch(self.query_type(), query));
        };
        let mut params = Map::new();
        params.insert("value".to_string(), term.value.clone());
        insert_common(&mut params, term.boost, term.name.as_deref());
        Ok(json!({ "term": single_field(&term.field, params) }))
    }
}

/// `{"terms": {field: [values], "boost"}}`
#[derive(Debug, Clone, Copy, Default)]
pub struct TermsAssembler;

impl QueryAssembler for TermsAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::Terms
    }

    fn assemble(&self, query: &Query, _compiler: &QueryCompiler) -> Result<Value> {
        let Query::Terms(terms) = query else {
            return Err(mismatch(self.query_type(), query));
        };
        let mut params = Map::new();
        params.insert(terms.field.clone(), Value::Array(terms.values.clone()));
        insert_common(&mut params, terms.boost, terms.name.as_deref());
        Ok(json!({ "terms": params }))
    }
}

/// `{"range": {field: {bounds.., "boost"}}}`
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeAssembler;

impl QueryAssembler for RangeAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::Range
    }

    fn assemble(&self, query: &Query, _compiler: &QueryCompiler) -> Result<Value> {
        let Query::Range(range) = query else {
            return Err(mismatch(self.query_type(), query));
        };
        let mut params = range.bounds.to_json_map();
        insert_common(&mut params, range.boost, range.name.as_deref());
        Ok(json!({ "range": single_field(&range.field, params) }))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MatchAssembler;

impl QueryAssembler for MatchAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::Match
    }

    fn assemble(&self, query: &Query, _compiler: &QueryCompiler) -> Result<Value> {
        let Query::Match(matched) = query else {
            return Err(mismatch(self.query_type(), query));
        };
        let mut params = Map::new();
        params.insert("query".to_string(), json!(matched.query_text));
        params.insert(
            "minimum_should_match".to_string(),
            matched.minimum_should_match.to_json(),
        );
        insert_fuzziness(&mut params, matched.fuzziness.as_ref());
        insert_common(&mut params, matched.boost, matched.name.as_deref());
        Ok(json!({ "match": single_field(&matched.field, params) }))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MultiMatchAssembler;

impl QueryAssembler for MultiMatchAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::MultiMatch
    }

    fn assemble(&self, query: &Query, _compiler: &QueryCompiler) -> Result<Value> {
        let Query::MultiMatch(multi_match) = query else {
            return Err(mismatch(self.query_type(), query));
        };
        let mut params = Map::new();
        params.insert("query".to_string(), json!(multi_match.query_text));
        params.insert("fields".to_string(), json!(multi_match.weighted_field_names()));
        params.insert(
            "minimum_should_match".to_string(),
            multi_match.minimum_should_match.to_json(),
        );
        params.insert("tie_breaker".to_string(), json!(multi_match.tie_breaker));
        params.insert("type".to_string(), json!(multi_match.match_type.as_str()));
        if let Some(cutoff_frequency) = multi_match.cutoff_frequency {
            params.insert("cutoff_frequency".to_string(), json!(cutoff_frequency));
        }
        insert_fuzziness(&mut params, multi_match.fuzziness.as_ref());
        insert_common(&mut params, multi_match.boost, multi_match.name.as_deref());
        Ok(json!({ "multi_match": params }))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CommonAssembler;

impl QueryAssembler for CommonAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::Common
    }

    fn assemble(&self, query: &Query, _compiler: &QueryCompiler) -> Result<Value> {
        let Query::Common(common) = query else {
            return Err(mismatch(self.query_type(), query));
        };
        let mut params = Map::new();
        params.insert("query".to_string(), json!(common.query_text));
        params.insert("cutoff_frequency".to_string(), json!(common.cutoff_frequency));
        params.insert(
            "minimum_should_match".to_string(),
            common.minimum_should_match.to_json(),
        );
        insert_common(&mut params, common.boost, common.name.as_deref());
        Ok(json!({ "common": single_field(&common.field, params) }))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixAssembler;

impl QueryAssembler for PrefixAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::Prefix
    }

    fn assemble(&self, query: &Query, _compiler: &QueryCompiler) -> Result<Value> {
        let Query::Prefix(prefix) = query else {
            return Err(mismatch(self.query_type(), query));
        };
        let mut params = Map::new();
        params.insert("value".to_string(), json!(prefix.value));
        insert_common(&mut params, prefix.boost, prefix.name.as_deref());
        Ok(json!({ "prefix": single_field(&prefix.field, params) }))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RegexpAssembler;

impl QueryAssembler for RegexpAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::Regexp
    }

    fn assemble(&self, query: &Query, _compiler: &QueryCompiler) -> Result<Value> {
        let Query::Regexp(regexp) = query else {
            return Err(mismatch(self.query_type(), query));
        };
        let mut params = Map::new();
        params.insert("value".to_string(), json!(regexp.value));
        if let Some(flags) = &regexp.flags {
            params.insert("flags".to_string(), json!(flags));
        }
        insert_common(&mut params, regexp.boost, regexp.name.as_deref());
        Ok(json!({ "regexp": single_field(&regexp.field, params) }))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExistsAssembler;

impl QueryAssembler for ExistsAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::Exists
    }

    fn assemble(&self, query: &Query, _compiler: &QueryCompiler) -> Result<Value> {
        let Query::Exists(exists) = query else {
            return Err(mismatch(self.query_type(), query));
        };
        let mut params = Map::new();
        params.insert("field".to_string(), json!(exists.field));
        insert_common(&mut params, exists.boost, exists.name.as_deref());
        Ok(json!({ "exists": params }))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MoreLikeThisAssembler;

impl QueryAssembler for MoreLikeThisAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::MoreLikeThis
    }

    fn assemble(&self, query: &Query, _compiler: &QueryCompiler) -> Result<Value> {
        let Query::MoreLikeThis(mlt) = query else {
            return Err(mismatch(self.query_type(), query));
        };
        let mut params = Map::new();
        params.insert("fields".to_string(), json!(mlt.fields));
        params.insert("like".to_string(), Value::Array(mlt.like.clone()));
        params.insert(
            "minimum_should_match".to_string(),
            mlt.minimum_should_match.to_json(),
        );
        params.insert("include".to_string(), json!(mlt.include));
        let tunables = [
            ("min_term_freq", mlt.min_term_freq),
            ("min_doc_freq", mlt.min_doc_freq),
            ("max_query_terms", mlt.max_query_terms),
        ];
        for (key, value) in tunables {
            if let Some(value) = value {
                params.insert(key.to_string(), json!(value));
            }
        }
        insert_common(&mut params, mlt.boost, mlt.name.as_deref());
        Ok(json!({ "more_like_this": params }))
    }
}

/// Clause arrays always present; `minimum_should_match` only with should clauses.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolAssembler;

impl QueryAssembler for BoolAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::Bool
    }

    fn assemble(&self, query: &Query, compiler: &QueryCompiler) -> Result<Value> {
        let Query::Bool(bool_query) = query else {
            return Err(mismatch(self.query_type(), query));
        };
        let mut params = Map::new();
        let clauses = [
            ("must", &bool_query.must),
            ("should", &bool_query.should),
            ("must_not", &bool_query.must_not),
        ];
        for (clause, children) in clauses {
            let compiled = children
                .iter()
                .map(|child| compiler.compile(child))
                .collect::<Result<Vec<_>>>()?;
            params.insert(clause.to_string(), Value::Array(compiled));
        }
        if !bool_query.should.is_empty() {
            params.insert(
                "minimum_should_match".to_string(),
                bool_query.minimum_should_match.to_json(),
            );
        }
        insert_common(&mut params, bool_query.boost, bool_query.name.as_deref());
        Ok(json!({ "bool": params }))
    }
}

/// A bool with the query as `must` and the filter as `filter`, or a
/// `constant_score` over the filter when there is no query.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilteredAssembler;

impl QueryAssembler for FilteredAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::Filtered
    }

    fn assemble(&self, query: &Query, compiler: &QueryCompiler) -> Result<Value> {
        let Query::Filtered(filtered) = query else {
            return Err(mismatch(self.query_type(), query));
        };
        let filter = filtered
            .filter()
            .map(|filter| compiler.compile(filter))
            .transpose()?;

        let mut params = Map::new();
        let wrapper = match filtered.query() {
            Some(inner) => {
                params.insert("must".to_string(), json!([compiler.compile(inner)?]));
                if let Some(filter) = filter {
                    params.insert("filter".to_string(), filter);
                }
                "bool"
            }
            None => {
                let filter = filter.unwrap_or_else(|| json!({ "match_all": {} }));
                params.insert("filter".to_string(), filter);
                "constant_score"
            }
        };
        insert_common(&mut params, filtered.boost, filtered.name.as_deref());

        let mut document = Map::new();
        document.insert(wrapper.to_string(), Value::Object(params));
        Ok(Value::Object(document))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NestedAssembler;

impl QueryAssembler for NestedAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::Nested
    }

    fn assemble(&self, query: &Query, compiler: &QueryCompiler) -> Result<Value> {
        let Query::Nested(nested) = query else {
            return Err(mismatch(self.query_type(), query));
        };
        let mut params = Map::new();
        params.insert("path".to_string(), json!(nested.path));
        params.insert("score_mode".to_string(), json!(nested.score_mode.as_str()));
        params.insert("query".to_string(), compiler.compile(&nested.query)?);
        insert_common(&mut params, nested.boost, nested.name.as_deref());
        Ok(json!({ "nested": params }))
    }
}

/// Compiled as a bool with a single `must_not` clause.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAssembler;

impl QueryAssembler for NotAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::Not
    }

    fn assemble(&self, query: &Query, compiler: &QueryCompiler) -> Result<Value> {
        let Query::Not(not) = query else {
            return Err(mismatch(self.query_type(), query));
        };
        let mut params = Map::new();
        params.insert("must_not".to_string(), json!([compiler.compile(&not.query)?]));
        insert_common(&mut params, not.boost, not.name.as_deref());
        Ok(json!({ "bool": params }))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionScoreAssembler;

impl FunctionScoreAssembler {
    fn compile_function(function: &ScoreFunction, compiler: &QueryCompiler) -> Result<Value> {
        let mut compiled = function.body.clone();
        match &function.filter {
            Some(FunctionFilter::Query(filter)) => {
                compiled.insert("filter".to_string(), compiler.compile(filter)?);
            }
            Some(FunctionFilter::Compiled(filter)) => {
                compiled.insert("filter".to_string(), filter.clone());
            }
            None => {}
        }
        if let Some(weight) = function.weight {
            compiled.insert("weight".to_string(), json!(weight));
        }
        Ok(Value::Object(compiled))
    }
}

impl QueryAssembler for FunctionScoreAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::FunctionScore
    }

    fn assemble(&self, query: &Query, compiler: &QueryCompiler) -> Result<Value> {
        let Query::FunctionScore(function_score) = query else {
            return Err(mismatch(self.query_type(), query));
        };
        let mut params = Map::new();
        if let Some(inner) = &function_score.query {
            params.insert("query".to_string(), compiler.compile(inner)?);
        }
        params.insert(
            "score_mode".to_string(),
            json!(function_score.score_mode.as_str()),
        );
        params.insert(
            "boost_mode".to_string(),
            json!(function_score.boost_mode.as_str()),
        );
        let functions = function_score
            .functions
            .iter()
            .map(|function| Self::compile_function(function, compiler))
            .collect::<Result<Vec<_>>>()?;
        params.insert("functions".to_string(), Value::Array(functions));
        insert_common(
            &mut params,
            function_score.boost,
            function_score.name.as_deref(),
        );
        Ok(json!({ "function_score": params }))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::HalberdError;
    use crate::query::{
        BoolQuery, FilteredQuery, FunctionScoreQuery, MultiMatchQuery, NestedQuery, NotQuery,
        RangeQuery, ScoreMode, TermQuery, TermsQuery, WeightedFields,
    };

    fn compile(query: impl Into<Query>) -> Value {
        QueryCompiler::new().compile(&query.into()).unwrap()
    }

    #[test]
    fn test_term_with_name() {
        let query = Query::from(TermQuery::new("sku", "ABC-1")).named("sku_match");
        assert_eq!(
            compile(query),
            json!({"term": {"sku": {"value": "ABC-1", "boost": 1.0, "_name": "sku_match"}}})
        );
    }

    #[test]
    fn test_terms_and_range() {
        assert_eq!(
            compile(TermsQuery::new("color", ["red", "blue"])),
            json!({"terms": {"color": ["red", "blue"], "boost": 1.0}})
        );
        assert_eq!(
            compile(RangeQuery::new("price").gte(10).lt(50)),
            json!({"range": {"price": {"gte": 10, "lt": 50, "boost": 1.0}}})
        );
    }

    #[test]
    fn test_multi_match() {
        let mut fields = WeightedFields::new();
        fields.insert("name".to_string(), 5.0);
        fields.insert("search".to_string(), 1.0);
        let query = MultiMatchQuery::new("red shoes", fields)
            .minimum_should_match("100%")
            .cutoff_frequency(0.15);

        assert_eq!(
            compile(query),
            json!({"multi_match": {
                "query": "red shoes",
                "fields": ["name^5", "search^1"],
                "minimum_should_match": "100%",
                "tie_breaker": 1.0,
                "type": "best_fields",
                "cutoff_frequency": 0.15,
                "boost": 1.0
            }})
        );
    }

    #[test]
    fn test_empty_bool_has_no_minimum_should_match() {
        assert_eq!(
            compile(BoolQuery::new()),
            json!({"bool": {"must": [], "should": [], "must_not": [], "boost": 1.0}})
        );
    }

    #[test]
    fn test_bool_with_should_has_minimum_should_match() {
        let compiled = compile(BoolQuery::new().should(TermQuery::new("color", "red")));
        assert_eq!(compiled["bool"]["minimum_should_match"], json!(1));
        assert_eq!(compiled["bool"]["should"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_filtered_with_query_only() {
        let filtered = FilteredQuery::new(Some(TermQuery::new("sku", "A").into()), None).unwrap();
        assert_eq!(
            compile(filtered),
            json!({"bool": {
                "must": [{"term": {"sku": {"value": "A", "boost": 1.0}}}],
                "boost": 1.0
            }})
        );
    }

    #[test]
    fn test_filtered_without_query_is_constant_score() {
        let filtered =
            FilteredQuery::new(None, Some(TermQuery::new("in_stock", true).into())).unwrap();
        assert_eq!(
            compile(filtered),
            json!({"constant_score": {
                "filter": {"term": {"in_stock": {"value": true, "boost": 1.0}}},
                "boost": 1.0
            }})
        );

        let empty = FilteredQuery {
            query: None,
            filter: None,
            name: None,
            boost: 1.0,
        };
        assert_eq!(
            compile(empty),
            json!({"constant_score": {"filter": {"match_all": {}}, "boost": 1.0}})
        );
    }

    #[test]
    fn test_nested_and_not() {
        let nested = NestedQuery::new("offers", TermQuery::new("offers.seller", "acme"))
            .score_mode(ScoreMode::Max);
        let compiled = compile(nested);
        assert_eq!(compiled["nested"]["path"], json!("offers"));
        assert_eq!(compiled["nested"]["score_mode"], json!("max"));
        assert_eq!(
            compiled["nested"]["query"]["term"]["offers.seller"]["value"],
            json!("acme")
        );

        let not = compile(NotQuery::new(TermQuery::new("discontinued", true)));
        assert_eq!(
            not,
            json!({"bool": {
                "must_not": [{"term": {"discontinued": {"value": true, "boost": 1.0}}}],
                "boost": 1.0
            }})
        );
    }

    #[test]
    fn test_function_score_compiles_filters_lazily() {
        let mut body = Map::new();
        body.insert(
            "field_value_factor".to_string(),
            json!({"field": "popularity", "factor": 1.2}),
        );
        let precompiled = ScoreFunction {
            filter: Some(FunctionFilter::Compiled(json!({"term": {"new": true}}))),
            weight: Some(2.0),
            body: Map::new(),
        };
        let query = FunctionScoreQuery::new(Some(TermQuery::new("brand", "acme").into()))
            .function(ScoreFunction::new(body))
            .function(ScoreFunction::weight(3.0).with_filter(TermQuery::new("promo", true)))
            .function(precompiled);

        let compiled = compile(query);
        let functions = compiled["function_score"]["functions"].as_array().unwrap();
        assert_eq!(functions.len(), 3);
        assert_eq!(functions[0]["field_value_factor"]["field"], json!("popularity"));
        assert_eq!(
            functions[1],
            json!({"filter": {"term": {"promo": {"value": true, "boost": 1.0}}}, "weight": 3.0})
        );
        assert_eq!(functions[2]["filter"], json!({"term": {"new": true}}));
        assert_eq!(compiled["function_score"]["score_mode"], json!("multiply"));
        assert_eq!(compiled["function_score"]["boost_mode"], json!("multiply"));
    }

    #[test]
    fn test_assembler_rejects_other_variant() {
        let compiler = QueryCompiler::new();
        let term = Query::from(TermQuery::new("sku", "A"));

        let err = BoolAssembler.assemble(&term, &compiler).unwrap_err();
        assert!(matches!(
            err,
            HalberdError::TypeMismatch {
                expected: QueryType::Bool,
                actual: QueryType::Term
            }
        ));
        assert!(FilteredAssembler.assemble(&term, &compiler).is_err());
    }
}
