//! Property tests over the resolution pipeline.
//!
//! Run with: `cargo test --test pipeline_properties`

use halberd::dsl::QueryCompiler;
use halberd::fragment::{Fragment, FragmentStore, Parameters};
use halberd::query::{BoolQuery, TermQuery};
use halberd::request::{RequestCompiler, ResolvedRequest, SearchRequest, build_query};
use proptest::prelude::*;
use serde_json::{Map, Value, json};

const LEAF_COUNT: usize = 5;
const PARAMETER_COUNT: usize = 4;

/// A term fragment whose value is a literal or a placeholder.
fn leaf_strategy() -> impl Strategy<Value = Value> {
    (
        "[a-z]{1,6}",
        prop_oneof![
            "[a-z]{1,6}".prop_map(Value::String),
            (0..PARAMETER_COUNT).prop_map(|n| Value::String(format!("$p{n}$"))),
        ],
    )
        .prop_map(|(field, value)| json!({"type": "term", "field": field, "value": value}))
}

/// References to leaves, one past the last leaf never resolving.
fn clause_strategy() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(
        (0..=LEAF_COUNT).prop_map(|n| json!({"reference": format!("t{n}")})),
        0..3,
    )
}

fn store_strategy() -> impl Strategy<Value = FragmentStore> {
    (
        prop::collection::vec(leaf_strategy(), LEAF_COUNT),
        clause_strategy(),
        clause_strategy(),
        clause_strategy(),
        any::<bool>(),
    )
        .prop_map(|(leaves, must, should, must_not, with_filter)| {
            let mut queries = Map::new();
            for (i, leaf) in leaves.into_iter().enumerate() {
                queries.insert(format!("t{i}"), leaf);
            }
            queries.insert(
                "main".to_string(),
                json!({"type": "bool", "must": must, "should": should, "must_not": must_not}),
            );

            let mut store = json!({
                "root_query": "main",
                "queries": queries,
                "filters": {"visible": {"type": "term", "field": "visible", "value": "$p0$"}},
                "sort_orders": {"price": {"field": "price", "direction": "desc"}}
            });
            if with_filter {
                store["root_filter"] = json!("visible");
            }
            serde_json::from_value(store).unwrap()
        })
}

fn parameters_strategy() -> impl Strategy<Value = Parameters> {
    prop::collection::vec(prop::option::of("[a-z]{1,6}"), PARAMETER_COUNT).prop_map(|values| {
        let mut parameters = Parameters::new();
        for (n, value) in values.into_iter().enumerate() {
            if let Some(value) = value {
                parameters.set(format!("p{n}"), json!(value));
            }
        }
        parameters
    })
}

/// One side of a filtered fragment: absent, buildable, or not buildable.
fn side_strategy() -> impl Strategy<Value = Option<Value>> {
    prop_oneof![
        Just(None),
        "[a-z]{1,6}".prop_map(|field| Some(json!({"type": "exists", "field": field}))),
        Just(Some(json!({"type": "exists"}))),
        Just(Some(json!({"type": "no_such_query", "field": "x"}))),
    ]
}

fn side_builds(side: &Option<Value>) -> bool {
    side.clone()
        .and_then(Fragment::from_json)
        .and_then(|fragment| build_query(&fragment))
        .is_some()
}

proptest! {
    /// Resolving an already resolved request changes nothing.
    #[test]
    fn resolution_is_idempotent(store in store_strategy(), parameters in parameters_strategy()) {
        let first = ResolvedRequest::resolve(&store, &parameters);
        let resolved_store = first.fragments().clone().into_store();
        let again = ResolvedRequest::resolve(&resolved_store, &parameters);

        prop_assert_eq!(first.fragments(), again.fragments());
        prop_assert_eq!(first.query(None), again.query(None));

        let compiler = RequestCompiler::new();
        let once = compiler
            .compile_request(&SearchRequest::new(store).with_parameters(parameters.clone()))
            .unwrap();
        let twice = compiler
            .compile_request(&SearchRequest::new(resolved_store).with_parameters(parameters))
            .unwrap();
        prop_assert_eq!(once, twice);
    }

    /// A filtered fragment is absent exactly when neither side builds.
    #[test]
    fn filtered_collapses_without_both_sides(query in side_strategy(), filter in side_strategy()) {
        let expected_absent = !side_builds(&query) && !side_builds(&filter);

        let mut body = json!({"type": "filtered"});
        if let Some(query) = query {
            body["query"] = query;
        }
        if let Some(filter) = filter {
            body["filter"] = filter;
        }
        let fragment = Fragment::from_json(body).unwrap();

        prop_assert_eq!(build_query(&fragment).is_none(), expected_absent);
    }

    /// Compiled bool queries always carry the three clause arrays, and
    /// `minimum_should_match` only alongside should clauses.
    #[test]
    fn bool_clause_arrays_always_present(
        must in 0..3usize,
        should in 0..3usize,
        must_not in 0..3usize,
        boost in 0.5f64..4.0,
    ) {
        let mut query = BoolQuery::new();
        for i in 0..must {
            query = query.must(TermQuery::new("must", i as u64));
        }
        for i in 0..should {
            query = query.should(TermQuery::new("should", i as u64));
        }
        for i in 0..must_not {
            query = query.must_not(TermQuery::new("must_not", i as u64));
        }
        query.boost = boost;

        let compiled = QueryCompiler::new().compile(&query.into()).unwrap();
        let params = &compiled["bool"];
        prop_assert_eq!(params["must"].as_array().map(Vec::len), Some(must));
        prop_assert_eq!(params["should"].as_array().map(Vec::len), Some(should));
        prop_assert_eq!(params["must_not"].as_array().map(Vec::len), Some(must_not));
        prop_assert_eq!(params.get("minimum_should_match").is_some(), should > 0);
        prop_assert_eq!(&params["boost"], &json!(boost));
    }
}
