//! Metrics computed inside a bucket.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_metric_type() -> String {
    "stats".to_string()
}

/// A named metric sub-aggregation, e.g. `{"avg_price": {"avg": {"field": "price"}}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    /// Backend metric type: `avg`, `max`, `stats`, `cardinality`, ...
    #[serde(default = "default_metric_type")]
    pub metric_type: String,
    #[serde(default)]
    pub field: Option<String>,
    /// Extra metric parameters copied verbatim.
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl Metric {
    pub fn new<N, T>(name: N, metric_type: T) -> Self
    where
        N: Into<String>,
        T: Into<String>,
    {
        Metric {
            name: name.into(),
            metric_type: metric_type.into(),
            field: None,
            config: Map::new(),
        }
    }

    pub fn field<F: Into<String>>(mut self, field: F) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn config<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// The metric body, without the name.
    pub fn to_json(&self) -> Value {
        let mut params = Map::new();
        if let Some(field) = &self.field {
            params.insert("field".to_string(), Value::from(field.as_str()));
        }
        for (key, value) in &self.config {
            params.insert(key.clone(), value.clone());
        }
        let mut body = Map::new();
        body.insert(self.metric_type.clone(), Value::Object(params));
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_metric_body() {
        let metric = Metric::new("price_stats", "percentiles")
            .field("price")
            .config("percents", json!([50, 95]));

        assert_eq!(
            metric.to_json(),
            json!({"percentiles": {"field": "price", "percents": [50, 95]}})
        );
    }

    #[test]
    fn test_metric_type_defaults_to_stats() {
        let metric: Metric = serde_json::from_value(json!({"name": "s", "field": "price"})).unwrap();
        assert_eq!(metric.metric_type, "stats");
    }
}
