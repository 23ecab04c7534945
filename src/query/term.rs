//! Exact-value leaf queries: term, terms, prefix, regexp and exists.
//!
//! None of these are analyzed by the backend, so values must already be in the
//! indexed form.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::default_boost;

/// Matches documents whose field holds exactly one value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermQuery {
    pub field: String,
    pub value: Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_boost")]
    pub boost: f64,
}

impl TermQuery {
    /// Create a new term query.
    pub fn new<F, V>(field: F, value: V) -> Self
    where
        F: Into<String>,
        V: Into<Value>,
    {
        TermQuery {
            field: field.into(),
            value: value.into(),
            name: None,
            boost: 1.0,
        }
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f64) -> Self {
        self.boost = boost;
        self
    }
}

/// Matches documents whose field holds any of several values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsQuery {
    pub field: String,
    pub values: Vec<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_boost")]
    pub boost: f64,
}

impl TermsQuery {
    /// Create a new terms query.
    pub fn new<F, I, V>(field: F, values: I) -> Self
    where
        F: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        TermsQuery {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
            name: None,
            boost: 1.0,
        }
    }
}

/// Matches terms starting with a prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefixQuery {
    pub field: String,
    pub value: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_boost")]
    pub boost: f64,
}

impl PrefixQuery {
    /// Create a new prefix query.
    pub fn new<F: Into<String>, V: Into<String>>(field: F, value: V) -> Self {
        PrefixQuery {
            field: field.into(),
            value: value.into(),
            name: None,
            boost: 1.0,
        }
    }
}

/// Matches terms against a regular expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexpQuery {
    pub field: String,
    pub value: String,
    /// Optional syntax flags, e.g. `"INTERSECTION|COMPLEMENT"`.
    #[serde(default)]
    pub flags: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_boost")]
    pub boost: f64,
}

impl RegexpQuery {
    /// Create a new regexp query.
    pub fn new<F: Into<String>, V: Into<String>>(field: F, value: V) -> Self {
        RegexpQuery {
            field: field.into(),
            value: value.into(),
            flags: None,
            name: None,
            boost: 1.0,
        }
    }

    /// Set the syntax flags.
    pub fn with_flags<S: Into<String>>(mut self, flags: S) -> Self {
        self.flags = Some(flags.into());
        self
    }
}

/// Matches documents where a field has any value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistsQuery {
    pub field: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_boost")]
    pub boost: f64,
}

impl ExistsQuery {
    /// Create a new exists query.
    pub fn new<F: Into<String>>(field: F) -> Self {
        ExistsQuery {
            field: field.into(),
            name: None,
            boost: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_term_query_from_fragment() {
        let query: TermQuery = serde_json::from_value(json!({
            "type": "term",
            "field": "sku",
            "value": "ABC-1",
            "boost": 2
        }))
        .unwrap();

        assert_eq!(query.field, "sku");
        assert_eq!(query.value, json!("ABC-1"));
        assert_eq!(query.boost, 2.0);
        assert_eq!(query.name, None);
    }

    #[test]
    fn test_terms_query_requires_values() {
        let missing = serde_json::from_value::<TermsQuery>(json!({"field": "color"}));
        assert!(missing.is_err());

        let query = TermsQuery::new("color", ["red", "blue"]);
        assert_eq!(query.values, vec![json!("red"), json!("blue")]);
    }

    #[test]
    fn test_regexp_flags_default_to_none() {
        let query: RegexpQuery =
            serde_json::from_value(json!({"field": "sku", "value": "AB.*"})).unwrap();
        assert_eq!(query.flags, None);
        assert_eq!(query.boost, 1.0);
    }
}
