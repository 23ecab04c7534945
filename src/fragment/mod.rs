//! Raw request configuration before type resolution.
//!
//! A fragment is an untyped map carrying a `type` discriminator. Values inside it
//! are literals, [`FragmentValue::Placeholder`] sentinels for parameters the
//! request has not supplied yet, or reference tokens (`{"reference": "<id>"}`)
//! pointing at other fragments of the same store.
//!
//! Placeholders are recognized once, when JSON enters the crate: a string made of
//! a single `$`, one or more non-`$` characters and a closing `$` becomes
//! `Placeholder(name)`. Everything downstream works on the typed sentinel.

pub mod binding;
pub mod dereference;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use ahash::AHashMap;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

pub use self::binding::{BindingResolver, BoundFragments, is_fully_bound};
pub use self::dereference::{DereferencedFragments, Dereferencer, MAX_REFERENCE_DEPTH};

/// Key of the type discriminator inside a fragment.
pub const TYPE_KEY: &str = "type";

/// Key naming the target of a reference token.
pub const REFERENCE_KEY: &str = "reference";

/// Key carrying the boolean clause of a reference token.
pub const CLAUSE_KEY: &str = "clause";

static PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$([^$]+)\$$").expect("placeholder pattern is valid"));

/// Ordered map used for fragment bodies.
pub type FragmentMap = BTreeMap<String, FragmentValue>;

/// A value inside a fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum FragmentValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    /// An unbound request parameter.
    Placeholder(String),
    List(Vec<FragmentValue>),
    Map(FragmentMap),
}

impl FragmentValue {
    /// Parse a placeholder token, returning the parameter name.
    pub fn parse_placeholder(text: &str) -> Option<&str> {
        PLACEHOLDER_PATTERN
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|name| name.as_str())
    }

    /// Convert a JSON value, turning placeholder strings into sentinels.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => FragmentValue::Null,
            Value::Bool(b) => FragmentValue::Bool(b),
            Value::Number(n) => FragmentValue::Number(n),
            Value::String(s) => match Self::parse_placeholder(&s) {
                Some(name) => FragmentValue::Placeholder(name.to_string()),
                None => FragmentValue::String(s),
            },
            Value::Array(items) => {
                FragmentValue::List(items.into_iter().map(FragmentValue::from_json).collect())
            }
            Value::Object(map) => FragmentValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, FragmentValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert a JSON value verbatim. Strings never become placeholders.
    pub fn literal(value: Value) -> Self {
        match value {
            Value::Null => FragmentValue::Null,
            Value::Bool(b) => FragmentValue::Bool(b),
            Value::Number(n) => FragmentValue::Number(n),
            Value::String(s) => FragmentValue::String(s),
            Value::Array(items) => {
                FragmentValue::List(items.into_iter().map(FragmentValue::literal).collect())
            }
            Value::Object(map) => FragmentValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, FragmentValue::literal(v)))
                    .collect(),
            ),
        }
    }

    /// Convert back to JSON. Placeholders render as their `$name$` token.
    pub fn to_json(&self) -> Value {
        match self {
            FragmentValue::Null => Value::Null,
            FragmentValue::Bool(b) => Value::Bool(*b),
            FragmentValue::Number(n) => Value::Number(n.clone()),
            FragmentValue::String(s) => Value::String(s.clone()),
            FragmentValue::Placeholder(name) => Value::String(format!("${name}$")),
            FragmentValue::List(items) => {
                Value::Array(items.iter().map(FragmentValue::to_json).collect())
            }
            FragmentValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }

    /// Get the map if this value is one.
    pub fn as_map(&self) -> Option<&FragmentMap> {
        match self {
            FragmentValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Get the list if this value is one.
    pub fn as_list(&self) -> Option<&[FragmentValue]> {
        match self {
            FragmentValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get the string if this value is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FragmentValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The reference id if this value is a reference token.
    pub fn reference(&self) -> Option<&str> {
        self.as_map()?.get(REFERENCE_KEY)?.as_str()
    }

    /// Whether this value is a reference token.
    pub fn is_reference(&self) -> bool {
        self.reference().is_some()
    }
}

impl From<Value> for FragmentValue {
    fn from(value: Value) -> Self {
        FragmentValue::from_json(value)
    }
}

impl Serialize for FragmentValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FragmentValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(FragmentValue::from_json)
    }
}

/// A single configuration unit: a map with a `type` discriminator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragment {
    body: FragmentMap,
}

impl Fragment {
    /// Create a fragment from its body.
    pub fn new(body: FragmentMap) -> Self {
        Fragment { body }
    }

    /// Create a fragment from a JSON object. Returns `None` for non-objects.
    pub fn from_json(value: Value) -> Option<Self> {
        match FragmentValue::from_json(value) {
            FragmentValue::Map(body) => Some(Fragment { body }),
            _ => None,
        }
    }

    /// Convert to JSON.
    pub fn to_json(&self) -> Value {
        FragmentValue::Map(self.body.clone()).to_json()
    }

    /// The `type` discriminator.
    pub fn kind(&self) -> Option<&str> {
        self.body.get(TYPE_KEY).and_then(FragmentValue::as_str)
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&FragmentValue> {
        self.body.get(key)
    }

    /// Whether the fragment has a key.
    pub fn contains(&self, key: &str) -> bool {
        self.body.contains_key(key)
    }

    /// Get the body.
    pub fn body(&self) -> &FragmentMap {
        &self.body
    }

    /// Consume into the body.
    pub fn into_body(self) -> FragmentMap {
        self.body
    }

    /// View the whole fragment as a value.
    pub fn as_value(&self) -> FragmentValue {
        FragmentValue::Map(self.body.clone())
    }
}

impl Serialize for Fragment {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Fragment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Fragment::from_json(value).ok_or_else(|| serde::de::Error::custom("fragment must be a map"))
    }
}

/// Named fragments in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FragmentTable {
    entries: Vec<(String, Fragment)>,
    index: AHashMap<String, usize>,
}

impl FragmentTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a fragment.
    pub fn insert<S: Into<String>>(&mut self, name: S, fragment: Fragment) {
        let name = name.into();
        match self.index.get(&name) {
            Some(&position) => self.entries[position].1 = fragment,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, fragment));
            }
        }
    }

    /// Builder-style insert.
    pub fn with<S: Into<String>>(mut self, name: S, fragment: Fragment) -> Self {
        self.insert(name, fragment);
        self
    }

    /// Look up a fragment by name.
    pub fn get(&self, name: &str) -> Option<&Fragment> {
        self.index.get(name).map(|&position| &self.entries[position].1)
    }

    /// Iterate entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Fragment)> {
        self.entries.iter().map(|(name, f)| (name.as_str(), f))
    }

    /// Number of fragments.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Fragment)> for FragmentTable {
    fn from_iter<I: IntoIterator<Item = (String, Fragment)>>(iter: I) -> Self {
        let mut table = FragmentTable::new();
        for (name, fragment) in iter {
            table.insert(name, fragment);
        }
        table
    }
}

impl Serialize for FragmentTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(name, fragment)| (name.clone(), fragment.to_json()))
            .collect();
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FragmentTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        let mut table = FragmentTable::new();
        for (name, value) in map {
            match Fragment::from_json(value) {
                Some(fragment) => table.insert(name, fragment),
                None => log::warn!("ignoring fragment {name}: not a map"),
            }
        }
        Ok(table)
    }
}

/// The merged configuration of one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FragmentStore {
    /// Name of the query fragment used as the request query.
    pub root_query: Option<String>,
    /// Name of the filter fragment applied to the request query.
    pub root_filter: Option<String>,
    pub queries: FragmentTable,
    pub filters: FragmentTable,
    pub aggregations: FragmentTable,
    pub sort_orders: FragmentTable,
}

impl FragmentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a store from a JSON string.
    pub fn from_json_str(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Parameter values supplied by the current request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    values: AHashMap<String, FragmentValue>,
}

impl Parameters {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter from a JSON value. The value is taken literally.
    pub fn set<S: Into<String>>(&mut self, name: S, value: Value) {
        self.values.insert(name.into(), FragmentValue::literal(value));
    }

    /// Builder-style set.
    pub fn with<S: Into<String>>(mut self, name: S, value: Value) -> Self {
        self.set(name, value);
        self
    }

    /// Get a parameter value.
    pub fn get(&self, name: &str) -> Option<&FragmentValue> {
        self.values.get(name)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for Parameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let map: BTreeMap<&String, Value> =
            self.values.iter().map(|(k, v)| (k, v.to_json())).collect();
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Parameters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        let mut parameters = Parameters::new();
        for (name, value) in map {
            parameters.set(name, value);
        }
        Ok(parameters)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_placeholder_detection() {
        assert_eq!(FragmentValue::parse_placeholder("$color$"), Some("color"));
        assert_eq!(FragmentValue::parse_placeholder("$a b$"), Some("a b"));
        assert_eq!(FragmentValue::parse_placeholder("$$"), None);
        assert_eq!(FragmentValue::parse_placeholder("$a$b$"), None);
        assert_eq!(FragmentValue::parse_placeholder("price $10$ off"), None);
        assert_eq!(FragmentValue::parse_placeholder("US$"), None);
    }

    #[test]
    fn test_from_json_converts_placeholders() {
        let value = FragmentValue::from_json(json!({
            "type": "term",
            "field": "color",
            "value": "$color$",
            "tags": ["a", "$tag$"]
        }));

        let map = value.as_map().unwrap();
        assert_eq!(
            map.get("value"),
            Some(&FragmentValue::Placeholder("color".to_string()))
        );
        assert_eq!(
            map.get("tags").unwrap().as_list().unwrap()[1],
            FragmentValue::Placeholder("tag".to_string())
        );
        assert_eq!(value.to_json()["value"], json!("$color$"));
    }

    #[test]
    fn test_reference_token() {
        let token = FragmentValue::from_json(json!({"reference": "visibility", "clause": "must"}));
        assert!(token.is_reference());
        assert_eq!(token.reference(), Some("visibility"));

        let fragment = FragmentValue::from_json(json!({"type": "term"}));
        assert!(!fragment.is_reference());
    }

    #[test]
    fn test_fragment_table_keeps_declaration_order() {
        let table: FragmentTable = serde_json::from_value(json!({
            "price": {"type": "standard", "field": "price"},
            "name": {"type": "standard", "field": "name"},
            "broken": 3
        }))
        .unwrap();

        let names: Vec<&str> = table.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["price", "name"]);
        assert_eq!(table.get("name").unwrap().kind(), Some("standard"));
    }

    #[test]
    fn test_fragment_table_insert_replaces() {
        let mut table = FragmentTable::new();
        table.insert("a", Fragment::from_json(json!({"type": "term"})).unwrap());
        table.insert("a", Fragment::from_json(json!({"type": "terms"})).unwrap());
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("a").unwrap().kind(), Some("terms"));
    }

    #[test]
    fn test_store_from_json() {
        let store = FragmentStore::from_json_str(
            r#"{
                "root_query": "main",
                "queries": {"main": {"type": "match", "field": "name", "query_text": "$q$"}}
            }"#,
        )
        .unwrap();

        assert_eq!(store.root_query.as_deref(), Some("main"));
        assert!(store.filters.is_empty());
        assert_eq!(
            store.queries.get("main").unwrap().get("query_text"),
            Some(&FragmentValue::Placeholder("q".to_string()))
        );
    }
}
