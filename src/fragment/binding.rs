//! Placeholder binding.
//!
//! Substitutes request parameters into fragments and keeps only the fragments
//! left without any placeholder. A fragment that still depends on a parameter the
//! request never supplied (a facet value nobody selected, say) is dropped
//! silently; that is the normal way optional configuration switches itself off.

use log::debug;

use crate::fragment::{Fragment, FragmentStore, FragmentTable, FragmentValue, Parameters};

/// Whether a value contains no placeholder at any depth.
///
/// Stops at the first placeholder found.
pub fn is_fully_bound(value: &FragmentValue) -> bool {
    match value {
        FragmentValue::Placeholder(_) => false,
        FragmentValue::List(items) => items.iter().all(is_fully_bound),
        FragmentValue::Map(map) => map.values().all(is_fully_bound),
        _ => true,
    }
}

/// Fragments of a store that are fully bound.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundFragments {
    pub root_query: Option<String>,
    pub root_filter: Option<String>,
    pub queries: FragmentTable,
    pub filters: FragmentTable,
    pub aggregations: FragmentTable,
    pub sort_orders: FragmentTable,
}

/// Binds request parameters into a fragment store.
#[derive(Debug, Clone, Copy)]
pub struct BindingResolver<'a> {
    parameters: &'a Parameters,
}

impl<'a> BindingResolver<'a> {
    /// Create a resolver for the given request parameters.
    pub fn new(parameters: &'a Parameters) -> Self {
        BindingResolver { parameters }
    }

    /// Replace every placeholder that names a known parameter.
    pub fn bind_value(&self, value: &FragmentValue) -> FragmentValue {
        match value {
            FragmentValue::Placeholder(name) => match self.parameters.get(name) {
                Some(bound) => bound.clone(),
                None => value.clone(),
            },
            FragmentValue::List(items) => {
                FragmentValue::List(items.iter().map(|v| self.bind_value(v)).collect())
            }
            FragmentValue::Map(map) => FragmentValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.bind_value(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Bind a fragment, returning it only if nothing is left unbound.
    pub fn bind_fragment(&self, fragment: &Fragment) -> Option<Fragment> {
        let bound = self.bind_value(&fragment.as_value());
        if !is_fully_bound(&bound) {
            return None;
        }
        match bound {
            FragmentValue::Map(body) => Some(Fragment::new(body)),
            _ => None,
        }
    }

    fn bind_table(&self, kind: &str, table: &FragmentTable) -> FragmentTable {
        table
            .iter()
            .filter_map(|(name, fragment)| match self.bind_fragment(fragment) {
                Some(bound) => Some((name.to_string(), bound)),
                None => {
                    debug!("skipping unbound {kind} fragment {name}");
                    None
                }
            })
            .collect()
    }

    /// Bind a whole store.
    pub fn resolve(&self, store: &FragmentStore) -> BoundFragments {
        BoundFragments {
            root_query: store.root_query.clone(),
            root_filter: store.root_filter.clone(),
            queries: self.bind_table("query", &store.queries),
            filters: self.bind_table("filter", &store.filters),
            aggregations: self.bind_table("aggregation", &store.aggregations),
            sort_orders: self.bind_table("sort order", &store.sort_orders),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fragment(value: serde_json::Value) -> Fragment {
        Fragment::from_json(value).unwrap()
    }

    #[test]
    fn test_is_fully_bound_recurses() {
        let bound = FragmentValue::from_json(json!({"a": [1, {"b": "text"}]}));
        assert!(is_fully_bound(&bound));

        let unbound = FragmentValue::from_json(json!({"a": [1, {"b": "$x$"}]}));
        assert!(!is_fully_bound(&unbound));
    }

    #[test]
    fn test_dollar_literals_are_bound() {
        let value = FragmentValue::from_json(json!({"label": "save $5 today", "currency": "$"}));
        assert!(is_fully_bound(&value));
    }

    #[test]
    fn test_bind_substitutes_known_parameters() {
        let parameters = Parameters::new().with("color", json!(["red", "blue"]));
        let resolver = BindingResolver::new(&parameters);

        let bound = resolver
            .bind_fragment(&fragment(json!({
                "type": "terms",
                "field": "color",
                "values": "$color$"
            })))
            .unwrap();

        assert_eq!(bound.to_json()["values"], json!(["red", "blue"]));
    }

    #[test]
    fn test_resolve_drops_unbound_fragments() {
        let mut store = FragmentStore::new();
        store
            .queries
            .insert("sku", fragment(json!({"type": "term", "field": "sku", "value": "ABC-1"})));
        store
            .filters
            .insert("brand", fragment(json!({"type": "term", "field": "brand", "value": "$brand$"})));
        store.aggregations.insert(
            "size",
            fragment(json!({"type": "term", "field": "size", "include": "$sizes$"})),
        );

        let parameters = Parameters::new();
        let bound = BindingResolver::new(&parameters).resolve(&store);

        assert!(bound.queries.get("sku").is_some());
        assert!(bound.filters.get("brand").is_none());
        assert!(bound.aggregations.is_empty());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut store = FragmentStore::new();
        store
            .queries
            .insert("q", fragment(json!({"type": "match", "field": "name", "query_text": "$q$"})));
        let parameters = Parameters::new().with("q", json!("shoes"));
        let resolver = BindingResolver::new(&parameters);

        let once = resolver.resolve(&store);
        let again_store = FragmentStore {
            queries: once.queries.clone(),
            ..FragmentStore::new()
        };
        let twice = resolver.resolve(&again_store);
        assert_eq!(once.queries, twice.queries);
    }

    #[test]
    fn test_dollar_shaped_parameter_value_is_literal() {
        let mut store = FragmentStore::new();
        store.queries.insert(
            "promo",
            fragment(json!({"type": "term", "field": "promo_code", "value": "$code$"})),
        );
        let parameters = Parameters::new().with("code", json!("$5$"));

        let bound = BindingResolver::new(&parameters).resolve(&store);

        let Some(promo) = bound.queries.get("promo") else {
            panic!("the promo query should stay bound");
        };
        assert_eq!(promo.get("value"), Some(&FragmentValue::String("$5$".to_string())));
        assert_eq!(promo.to_json()["value"], json!("$5$"));
    }
}
