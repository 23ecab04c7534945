//! Range query over numeric, date or keyword values.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::query::default_boost;

/// Bounds of a range query. Any subset may be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
    /// Date format of the bound values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl RangeBounds {
    /// Whether no bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.gt.is_none() && self.gte.is_none() && self.lt.is_none() && self.lte.is_none()
    }

    /// Bounds as wire keys, in `gt, gte, lt, lte, format` order.
    pub fn to_json_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let bounds = [
            ("gt", &self.gt),
            ("gte", &self.gte),
            ("lt", &self.lt),
            ("lte", &self.lte),
        ];
        for (key, bound) in bounds {
            if let Some(value) = bound {
                map.insert(key.to_string(), value.clone());
            }
        }
        if let Some(format) = &self.format {
            map.insert("format".to_string(), Value::from(format.as_str()));
        }
        map
    }
}

/// Matches documents whose field value falls within the bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeQuery {
    pub field: String,
    #[serde(default)]
    pub bounds: RangeBounds,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_boost")]
    pub boost: f64,
}

impl RangeQuery {
    /// Create an unbounded range query on a field.
    pub fn new<F: Into<String>>(field: F) -> Self {
        RangeQuery {
            field: field.into(),
            bounds: RangeBounds::default(),
            name: None,
            boost: 1.0,
        }
    }

    /// Set an inclusive lower bound.
    pub fn gte<V: Into<Value>>(mut self, value: V) -> Self {
        self.bounds.gte = Some(value.into());
        self
    }

    /// Set an exclusive lower bound.
    pub fn gt<V: Into<Value>>(mut self, value: V) -> Self {
        self.bounds.gt = Some(value.into());
        self
    }

    /// Set an inclusive upper bound.
    pub fn lte<V: Into<Value>>(mut self, value: V) -> Self {
        self.bounds.lte = Some(value.into());
        self
    }

    /// Set an exclusive upper bound.
    pub fn lt<V: Into<Value>>(mut self, value: V) -> Self {
        self.bounds.lt = Some(value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_range_from_fragment() {
        let query: RangeQuery = serde_json::from_value(json!({
            "type": "range",
            "field": "price",
            "bounds": {"gte": 10, "lt": 50}
        }))
        .unwrap();

        assert_eq!(query.bounds.gte, Some(json!(10)));
        assert_eq!(query.bounds.lt, Some(json!(50)));
        assert!(!query.bounds.is_unbounded());
    }

    #[test]
    fn test_bounds_wire_map() {
        let query = RangeQuery::new("price").gt(5).lte(20);
        let map = query.bounds.to_json_map();
        assert_eq!(Value::Object(map), json!({"gt": 5, "lte": 20}));
    }

    #[test]
    fn test_unbounded_range() {
        assert!(RangeQuery::new("created_at").bounds.is_unbounded());
    }
}
