//! Reference resolution between bound fragments.
//!
//! Reference tokens are replaced by a copy of the fragment they name, resolved
//! recursively, so the result is a tree in which every node is owned by exactly
//! one parent. Lookups go through bound queries first, then bound filters.
//!
//! A reference that cannot be resolved disappears: list entries are skipped and
//! map slots are removed. Sort orders, buckets and score functions whose filter
//! slot disappeared this way are discarded as a whole, since keeping them would
//! silently widen what they apply to.

use log::{debug, warn};

use crate::fragment::{
    BoundFragments, CLAUSE_KEY, Fragment, FragmentMap, FragmentStore, FragmentTable,
    FragmentValue, TYPE_KEY,
};

/// Maximum number of reference hops followed from any fragment.
pub const MAX_REFERENCE_DEPTH: usize = 32;

/// Slots holding a single child fragment, which may be given as a one-element list.
const SINGLE_CHILD_KEYS: &[&str] = &["query", "filter", "nested_filter"];

const BOOL_CLAUSES: &[&str] = &["must", "should", "must_not"];

const BUCKET_FILTER_KEYS: &[&str] = &["filter", "nested_filter"];

const SORT_FILTER_KEYS: &[&str] = &["nested_filter"];

const CHILD_BUCKETS_KEY: &str = "child_buckets";

/// Fragments of a request with all references inlined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DereferencedFragments {
    pub root_query: Option<Fragment>,
    pub root_filter: Option<Fragment>,
    pub aggregations: Vec<(String, Fragment)>,
    pub sort_orders: Vec<(String, Fragment)>,
}

impl DereferencedFragments {
    /// Turn the resolved fragments back into a store.
    ///
    /// The root query and filter are stored under `query` and `filter`.
    pub fn into_store(self) -> FragmentStore {
        let mut store = FragmentStore::new();
        if let Some(query) = self.root_query {
            store.queries.insert("query", query);
            store.root_query = Some("query".to_string());
        }
        if let Some(filter) = self.root_filter {
            store.filters.insert("filter", filter);
            store.root_filter = Some("filter".to_string());
        }
        store.aggregations = self.aggregations.into_iter().collect::<FragmentTable>();
        store.sort_orders = self.sort_orders.into_iter().collect::<FragmentTable>();
        store
    }
}

/// Resolves references against a set of bound fragments.
#[derive(Debug, Clone, Copy)]
pub struct Dereferencer<'a> {
    bound: &'a BoundFragments,
}

impl<'a> Dereferencer<'a> {
    /// Create a dereferencer over bound fragments.
    pub fn new(bound: &'a BoundFragments) -> Self {
        Dereferencer { bound }
    }

    /// Find a bound query or filter by id.
    pub fn lookup(&self, id: &str) -> Option<&'a Fragment> {
        self.bound
            .queries
            .get(id)
            .or_else(|| self.bound.filters.get(id))
    }

    /// Resolve every reference inside a fragment.
    ///
    /// Returns `None` when the fragment is itself a dangling reference.
    pub fn dereference(&self, fragment: &Fragment) -> Option<Fragment> {
        match self.dereference_value(&fragment.as_value(), 0)? {
            FragmentValue::Map(body) => Some(Fragment::new(body)),
            _ => None,
        }
    }

    /// Resolve a sort order, discarding it if its nested filter is unresolvable.
    pub fn dereference_sort_order(&self, fragment: &Fragment) -> Option<Fragment> {
        self.dereference_guarded(fragment, SORT_FILTER_KEYS)
    }

    /// Resolve a bucket and its child buckets.
    ///
    /// A bucket whose filter or nested filter is unresolvable is discarded.
    pub fn dereference_bucket(&self, fragment: &Fragment) -> Option<Fragment> {
        let mut body = fragment.body().clone();
        let children = body.remove(CHILD_BUCKETS_KEY);
        let mut resolved = self
            .dereference_guarded(&Fragment::new(body), BUCKET_FILTER_KEYS)?
            .into_body();

        if let Some(children) = children {
            let children = match children {
                FragmentValue::List(items) => FragmentValue::List(
                    items
                        .iter()
                        .filter_map(|child| self.dereference_child_bucket(child))
                        .collect(),
                ),
                FragmentValue::Map(named) => FragmentValue::Map(
                    named
                        .iter()
                        .filter_map(|(name, child)| {
                            self.dereference_child_bucket(child)
                                .map(|resolved| (name.clone(), resolved))
                        })
                        .collect(),
                ),
                other => other,
            };
            resolved.insert(CHILD_BUCKETS_KEY.to_string(), children);
        }

        Some(Fragment::new(resolved))
    }

    /// Resolve the root query, root filter, aggregations and sort orders.
    pub fn resolve(&self) -> DereferencedFragments {
        let root = |id: &Option<String>| {
            id.as_deref()
                .and_then(|id| self.lookup(id))
                .and_then(|fragment| self.dereference(fragment))
        };

        DereferencedFragments {
            root_query: root(&self.bound.root_query),
            root_filter: root(&self.bound.root_filter),
            aggregations: self
                .bound
                .aggregations
                .iter()
                .filter_map(|(name, fragment)| {
                    let resolved = self.dereference_bucket(fragment);
                    if resolved.is_none() {
                        debug!("dropping aggregation {name}: unresolved filter");
                    }
                    resolved.map(|f| (name.to_string(), f))
                })
                .collect(),
            sort_orders: self
                .bound
                .sort_orders
                .iter()
                .filter_map(|(name, fragment)| {
                    let resolved = self.dereference_sort_order(fragment);
                    if resolved.is_none() {
                        debug!("dropping sort order {name}: unresolved nested filter");
                    }
                    resolved.map(|f| (name.to_string(), f))
                })
                .collect(),
        }
    }

    fn dereference_child_bucket(&self, child: &FragmentValue) -> Option<FragmentValue> {
        let body = child.as_map()?;
        self.dereference_bucket(&Fragment::new(body.clone()))
            .map(|resolved| FragmentValue::Map(resolved.into_body()))
    }

    fn dereference_guarded(&self, fragment: &Fragment, guarded: &[&str]) -> Option<Fragment> {
        let resolved = self.dereference(fragment)?;
        let lost = guarded
            .iter()
            .any(|key| fragment.contains(key) && !resolved.contains(key));
        if lost { None } else { Some(resolved) }
    }

    fn dereference_value(&self, value: &FragmentValue, depth: usize) -> Option<FragmentValue> {
        match value {
            FragmentValue::Map(map) => {
                if let Some(id) = value.reference() {
                    if depth >= MAX_REFERENCE_DEPTH {
                        warn!("reference chain deeper than {MAX_REFERENCE_DEPTH} at {id}, pruning");
                        return None;
                    }
                    return match self.lookup(id) {
                        Some(target) => self
                            .dereference_map(target.body(), depth + 1)
                            .map(FragmentValue::Map),
                        None => {
                            debug!("unresolved reference {id}");
                            None
                        }
                    };
                }
                self.dereference_map(map, depth).map(FragmentValue::Map)
            }
            FragmentValue::List(items) => Some(FragmentValue::List(
                items
                    .iter()
                    .filter_map(|item| self.dereference_value(item, depth))
                    .collect(),
            )),
            other => Some(other.clone()),
        }
    }

    fn dereference_map(&self, map: &FragmentMap, depth: usize) -> Option<FragmentMap> {
        let mut source = map.clone();
        let kind = source
            .get(TYPE_KEY)
            .and_then(FragmentValue::as_str)
            .map(str::to_string);

        if kind.as_deref() == Some("bool") {
            normalize_bool_clauses(&mut source);
        }

        let mut resolved = FragmentMap::new();
        for (key, value) in source {
            let value = if SINGLE_CHILD_KEYS.contains(&key.as_str()) {
                unwrap_single_child(value)
            } else {
                value
            };

            let dereferenced = if kind.as_deref() == Some("function_score") && key == "functions" {
                Some(self.dereference_functions(&value, depth))
            } else {
                self.dereference_value(&value, depth)
            };

            match dereferenced {
                Some(v) => {
                    resolved.insert(key, v);
                }
                None => debug!("removing unresolved slot {key}"),
            }
        }
        Some(resolved)
    }

    fn dereference_functions(&self, functions: &FragmentValue, depth: usize) -> FragmentValue {
        let resolve = |function: &FragmentValue| {
            let resolved = self.dereference_value(function, depth)?;
            let had_filter = function.as_map().is_some_and(|m| m.contains_key("filter"));
            let has_filter = resolved.as_map().is_some_and(|m| m.contains_key("filter"));
            if had_filter && !has_filter {
                debug!("dropping score function with unresolved filter");
                None
            } else {
                Some(resolved)
            }
        };

        match functions {
            FragmentValue::List(items) => {
                FragmentValue::List(items.iter().filter_map(resolve).collect())
            }
            FragmentValue::Map(named) => FragmentValue::Map(
                named
                    .iter()
                    .filter_map(|(name, f)| resolve(f).map(|r| (name.clone(), r)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

/// Move `queries` entries carrying a `clause` key into their clause list.
fn normalize_bool_clauses(body: &mut FragmentMap) {
    let Some(FragmentValue::List(entries)) = body.remove("queries") else {
        return;
    };

    for entry in entries {
        let clause = entry
            .as_map()
            .and_then(|m| m.get(CLAUSE_KEY))
            .and_then(FragmentValue::as_str)
            .filter(|clause| BOOL_CLAUSES.contains(clause))
            .unwrap_or("must")
            .to_string();

        match body
            .entry(clause)
            .or_insert_with(|| FragmentValue::List(Vec::new()))
        {
            FragmentValue::List(items) => items.push(entry),
            single => {
                let existing = std::mem::replace(single, FragmentValue::Null);
                *single = FragmentValue::List(vec![existing, entry]);
            }
        }
    }
}

fn unwrap_single_child(value: FragmentValue) -> FragmentValue {
    match value {
        FragmentValue::List(mut items) if items.len() == 1 && items[0].as_map().is_some() => {
            items.remove(0)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::fragment::{BindingResolver, Parameters};

    fn fragment(value: Value) -> Fragment {
        Fragment::from_json(value).unwrap()
    }

    fn bound(store: &FragmentStore) -> BoundFragments {
        BindingResolver::new(&Parameters::new()).resolve(store)
    }

    #[test]
    fn test_bool_clauses_are_inlined() {
        let mut store = FragmentStore::new();
        store.root_query = Some("main".to_string());
        store.queries.insert(
            "main",
            fragment(json!({
                "type": "bool",
                "must": [{"reference": "missing"}],
                "should": [{"reference": "sku"}]
            })),
        );
        store
            .queries
            .insert("sku", fragment(json!({"type": "term", "field": "sku", "value": "ABC-1"})));

        let bound = bound(&store);
        let resolved = Dereferencer::new(&bound).resolve();
        let root = resolved.root_query.unwrap().to_json();

        assert_eq!(root["must"], json!([]));
        assert_eq!(root["should"][0]["field"], json!("sku"));
    }

    #[test]
    fn test_queries_list_uses_clause_key() {
        let mut store = FragmentStore::new();
        store.queries.insert(
            "main",
            fragment(json!({
                "type": "bool",
                "queries": [
                    {"reference": "a", "clause": "should"},
                    {"reference": "b", "clause": "must_not"},
                    {"reference": "a"}
                ]
            })),
        );
        store
            .queries
            .insert("a", fragment(json!({"type": "exists", "field": "a"})));
        store
            .filters
            .insert("b", fragment(json!({"type": "exists", "field": "b"})));

        let bound = bound(&store);
        let main = Dereferencer::new(&bound)
            .dereference(bound.queries.get("main").unwrap())
            .unwrap()
            .to_json();

        assert_eq!(main["should"][0]["field"], json!("a"));
        assert_eq!(main["must_not"][0]["field"], json!("b"));
        assert_eq!(main["must"][0]["field"], json!("a"));
        assert!(main.get("queries").is_none());
    }

    #[test]
    fn test_filtered_single_element_list() {
        let mut store = FragmentStore::new();
        store.queries.insert(
            "filtered",
            fragment(json!({
                "type": "filtered",
                "query": [{"reference": "q"}],
                "filter": {"reference": "nowhere"}
            })),
        );
        store
            .queries
            .insert("q", fragment(json!({"type": "exists", "field": "q"})));

        let bound = bound(&store);
        let resolved = Dereferencer::new(&bound)
            .dereference(bound.queries.get("filtered").unwrap())
            .unwrap();

        assert_eq!(resolved.to_json()["query"]["field"], json!("q"));
        assert!(!resolved.contains("filter"));
    }

    #[test]
    fn test_nested_sort_with_dangling_filter_is_dropped() {
        let mut store = FragmentStore::new();
        store.sort_orders.insert(
            "price",
            fragment(json!({
                "type": "nested",
                "field": "price.value",
                "nested_path": "price",
                "nested_filter": {"reference": "customer_group"}
            })),
        );
        store
            .sort_orders
            .insert("name", fragment(json!({"type": "standard", "field": "name"})));

        let bound = bound(&store);
        let resolved = Dereferencer::new(&bound).resolve();

        let names: Vec<&str> = resolved.sort_orders.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["name"]);
    }

    #[test]
    fn test_bucket_child_with_dangling_filter_is_dropped() {
        let mut store = FragmentStore::new();
        store.aggregations.insert(
            "categories",
            fragment(json!({
                "type": "term",
                "field": "category",
                "child_buckets": [
                    {"type": "term", "name": "kept", "field": "brand"},
                    {"type": "term", "name": "lost", "field": "color", "filter": {"reference": "x"}}
                ]
            })),
        );

        let bound = bound(&store);
        let resolved = Dereferencer::new(&bound).resolve();
        let categories = resolved.aggregations[0].1.to_json();

        assert_eq!(categories["child_buckets"].as_array().unwrap().len(), 1);
        assert_eq!(categories["child_buckets"][0]["name"], json!("kept"));
    }

    #[test]
    fn test_function_with_dangling_filter_is_dropped() {
        let mut store = FragmentStore::new();
        store.queries.insert(
            "scored",
            fragment(json!({
                "type": "function_score",
                "functions": {
                    "stock": {"filter": {"reference": "in_stock"}, "weight": 2},
                    "promo": {"filter": {"reference": "promoted"}, "weight": 3}
                }
            })),
        );
        store
            .filters
            .insert("promoted", fragment(json!({"type": "term", "field": "promo", "value": true})));

        let bound = bound(&store);
        let resolved = Dereferencer::new(&bound)
            .dereference(bound.queries.get("scored").unwrap())
            .unwrap()
            .to_json();

        let functions = resolved["functions"].as_object().unwrap();
        assert_eq!(functions.len(), 1);
        assert_eq!(functions["promo"]["filter"]["field"], json!("promo"));
    }

    #[test]
    fn test_reference_chain_is_bounded() {
        let mut store = FragmentStore::new();
        store
            .queries
            .insert("loop", fragment(json!({"type": "not", "query": {"reference": "loop"}})));

        let bound = bound(&store);
        let resolved = Dereferencer::new(&bound)
            .dereference(bound.queries.get("loop").unwrap())
            .unwrap();

        let mut depth = 0;
        let mut current = resolved.to_json();
        while let Some(inner) = current.get("query").cloned() {
            depth += 1;
            current = inner;
        }
        assert_eq!(depth, MAX_REFERENCE_DEPTH);
    }
}
