//! Assemblers for span queries.

use serde_json::{Map, Value, json};

use crate::dsl::{QueryCompiler, SpanAssembler, insert_common, span_mismatch};
use crate::error::Result;
use crate::query::{QueryType, SpanQuery};

fn compile_clauses(clauses: &[SpanQuery], compiler: &QueryCompiler) -> Result<Value> {
    clauses
        .iter()
        .map(|clause| compiler.compile_span(clause))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

fn wrap(kind: &str, params: Map<String, Value>) -> Value {
    let mut document = Map::new();
    document.insert(kind.to_string(), Value::Object(params));
    Value::Object(document)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpanTermAssembler;

impl SpanAssembler for SpanTermAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::SpanTerm
    }

    fn assemble(&self, span: &SpanQuery, _compiler: &QueryCompiler) -> Result<Value> {
        let SpanQuery::Term(term) = span else {
            return Err(span_mismatch(self.query_type(), span));
        };
        let mut params = Map::new();
        params.insert("value".to_string(), json!(term.value));
        insert_common(&mut params, term.boost, term.name.as_deref());

        let mut by_field = Map::new();
        by_field.insert(term.field.clone(), Value::Object(params));
        Ok(wrap("span_term", by_field))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpanFirstAssembler;

impl SpanAssembler for SpanFirstAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::SpanFirst
    }

    fn assemble(&self, span: &SpanQuery, compiler: &QueryCompiler) -> Result<Value> {
        let SpanQuery::First(first) = span else {
            return Err(span_mismatch(self.query_type(), span));
        };
        let mut params = Map::new();
        params.insert("match".to_string(), compiler.compile_span(&first.span)?);
        params.insert("end".to_string(), json!(first.end));
        insert_common(&mut params, first.boost, first.name.as_deref());
        Ok(wrap("span_first", params))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpanNearAssembler;

impl SpanAssembler for SpanNearAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::SpanNear
    }

    fn assemble(&self, span: &SpanQuery, compiler: &QueryCompiler) -> Result<Value> {
        let SpanQuery::Near(near) = span else {
            return Err(span_mismatch(self.query_type(), span));
        };
        let mut params = Map::new();
        params.insert("clauses".to_string(), compile_clauses(&near.clauses, compiler)?);
        params.insert("slop".to_string(), json!(near.slop));
        params.insert("in_order".to_string(), json!(near.in_order));
        insert_common(&mut params, near.boost, near.name.as_deref());
        Ok(wrap("span_near", params))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpanOrAssembler;

impl SpanAssembler for SpanOrAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::SpanOr
    }

    fn assemble(&self, span: &SpanQuery, compiler: &QueryCompiler) -> Result<Value> {
        let SpanQuery::Or(or) = span else {
            return Err(span_mismatch(self.query_type(), span));
        };
        let mut params = Map::new();
        params.insert("clauses".to_string(), compile_clauses(&or.clauses, compiler)?);
        insert_common(&mut params, or.boost, or.name.as_deref());
        Ok(wrap("span_or", params))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpanNotAssembler;

impl SpanAssembler for SpanNotAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::SpanNot
    }

    fn assemble(&self, span: &SpanQuery, compiler: &QueryCompiler) -> Result<Value> {
        let SpanQuery::Not(not) = span else {
            return Err(span_mismatch(self.query_type(), span));
        };
        let mut params = Map::new();
        params.insert("include".to_string(), compiler.compile_span(&not.include)?);
        params.insert("exclude".to_string(), compiler.compile_span(&not.exclude)?);
        if let Some(pre) = not.pre {
            params.insert("pre".to_string(), json!(pre));
        }
        if let Some(post) = not.post {
            params.insert("post".to_string(), json!(post));
        }
        insert_common(&mut params, not.boost, not.name.as_deref());
        Ok(wrap("span_not", params))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpanContainingAssembler;

impl SpanAssembler for SpanContainingAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::SpanContaining
    }

    fn assemble(&self, span: &SpanQuery, compiler: &QueryCompiler) -> Result<Value> {
        let SpanQuery::Containing(containing) = span else {
            return Err(span_mismatch(self.query_type(), span));
        };
        let mut params = Map::new();
        params.insert("big".to_string(), compiler.compile_span(&containing.big)?);
        params.insert("little".to_string(), compiler.compile_span(&containing.little)?);
        insert_common(&mut params, containing.boost, containing.name.as_deref());
        Ok(wrap("span_containing", params))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpanWithinAssembler;

impl SpanAssembler for SpanWithinAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::SpanWithin
    }

    fn assemble(&self, span: &SpanQuery, compiler: &QueryCompiler) -> Result<Value> {
        let SpanQuery::Within(within) = span else {
            return Err(span_mismatch(self.query_type(), span));
        };
        let mut params = Map::new();
        params.insert("big".to_string(), compiler.compile_span(&within.big)?);
        params.insert("little".to_string(), compiler.compile_span(&within.little)?);
        insert_common(&mut params, within.boost, within.name.as_deref());
        Ok(wrap("span_within", params))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpanFieldMaskingAssembler;

impl SpanAssembler for SpanFieldMaskingAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::SpanFieldMasking
    }

    fn assemble(&self, span: &SpanQuery, compiler: &QueryCompiler) -> Result<Value> {
        let SpanQuery::FieldMasking(masking) = span else {
            return Err(span_mismatch(self.query_type(), span));
        };
        let mut params = Map::new();
        params.insert("query".to_string(), compiler.compile_span(&masking.span)?);
        params.insert("field".to_string(), json!(masking.field));
        insert_common(&mut params, masking.boost, masking.name.as_deref());
        Ok(wrap("span_field_masking", params))
    }
}

/// The wrapped query is compiled as an ordinary query.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanMultiTermAssembler;

impl SpanAssembler for SpanMultiTermAssembler {
    fn query_type(&self) -> QueryType {
        QueryType::SpanMultiTerm
    }

    fn assemble(&self, span: &SpanQuery, compiler: &QueryCompiler) -> Result<Value> {
        let SpanQuery::MultiTerm(multi) = span else {
            return Err(span_mismatch(self.query_type(), span));
        };
        let mut params = Map::new();
        params.insert("match".to_string(), compiler.compile(&multi.query)?);
        insert_common(&mut params, multi.boost, multi.name.as_deref());
        Ok(wrap("span_multi", params))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::HalberdError;
    use crate::query::{
        PrefixQuery, SpanFieldMaskingQuery, SpanFirstQuery, SpanMultiTermQuery, SpanNearQuery,
        SpanNotQuery, SpanTermQuery,
    };

    fn term(value: &str) -> SpanQuery {
        SpanTermQuery::new("name", value).into()
    }

    #[test]
    fn test_span_first_over_near() {
        let near = SpanNearQuery::new(vec![term("red"), term("shoes")], 0, true);
        let first = SpanQuery::from(SpanFirstQuery::new(near, 2).boost(5.0));

        let compiled = QueryCompiler::new().compile_span(&first).unwrap();
        assert_eq!(
            compiled,
            json!({"span_first": {
                "match": {"span_near": {
                    "clauses": [
                        {"span_term": {"name": {"value": "red", "boost": 1.0}}},
                        {"span_term": {"name": {"value": "shoes", "boost": 1.0}}}
                    ],
                    "slop": 0,
                    "in_order": true,
                    "boost": 1.0
                }},
                "end": 2,
                "boost": 5.0
            }})
        );
    }

    #[test]
    fn test_span_not_optional_offsets() {
        let mut not = SpanNotQuery::new(term("shoes"), term("laces"));
        not.post = Some(2);
        let compiled = QueryCompiler::new().compile_span(&not.into()).unwrap();
        assert_eq!(compiled["span_not"]["post"], json!(2));
        assert!(compiled["span_not"].get("pre").is_none());
    }

    #[test]
    fn test_span_multi_and_masking() {
        let multi = SpanMultiTermQuery::new(PrefixQuery::new("name", "sho")).unwrap();
        let compiled = QueryCompiler::new().compile_span(&multi.into()).unwrap();
        assert_eq!(
            compiled,
            json!({"span_multi": {
                "match": {"prefix": {"name": {"value": "sho", "boost": 1.0}}},
                "boost": 1.0
            }})
        );

        let masking = SpanFieldMaskingQuery::new(term("red"), "name.shingle");
        let compiled = QueryCompiler::new().compile_span(&masking.into()).unwrap();
        assert_eq!(compiled["span_field_masking"]["field"], json!("name.shingle"));
    }

    #[test]
    fn test_span_assembler_rejects_other_variant() {
        let err = SpanOrAssembler
            .assemble(&term("red"), &QueryCompiler::new())
            .unwrap_err();
        assert!(matches!(
            err,
            HalberdError::TypeMismatch {
                expected: QueryType::SpanOr,
                actual: QueryType::SpanTerm
            }
        ));
    }
}
