//! Pipeline aggregations running over the output of sibling or parent buckets.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A pipeline aggregation such as `bucket_selector`, `max_bucket` or `moving_fn`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub name: String,
    pub pipeline_type: String,
    /// A single path, or a map of script variable to path.
    pub buckets_path: Value,
    #[serde(default)]
    pub script: Option<String>,
    /// `skip` or `insert_zeros`.
    #[serde(default)]
    pub gap_policy: Option<String>,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl Pipeline {
    pub fn new<N, T, P>(name: N, pipeline_type: T, buckets_path: P) -> Self
    where
        N: Into<String>,
        T: Into<String>,
        P: Into<Value>,
    {
        Pipeline {
            name: name.into(),
            pipeline_type: pipeline_type.into(),
            buckets_path: buckets_path.into(),
            script: None,
            gap_policy: None,
            config: Map::new(),
        }
    }

    pub fn script<S: Into<String>>(mut self, script: S) -> Self {
        self.script = Some(script.into());
        self
    }

    pub fn gap_policy<S: Into<String>>(mut self, gap_policy: S) -> Self {
        self.gap_policy = Some(gap_policy.into());
        self
    }

    /// The pipeline body, without the name.
    pub fn to_json(&self) -> Value {
        let mut params = Map::new();
        params.insert("buckets_path".to_string(), self.buckets_path.clone());
        if let Some(script) = &self.script {
            params.insert("script".to_string(), Value::from(script.as_str()));
        }
        if let Some(gap_policy) = &self.gap_policy {
            params.insert("gap_policy".to_string(), Value::from(gap_policy.as_str()));
        }
        for (key, value) in &self.config {
            params.insert(key.clone(), value.clone());
        }
        let mut body = Map::new();
        body.insert(self.pipeline_type.clone(), Value::Object(params));
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_bucket_selector_body() {
        let pipeline = Pipeline::new(
            "min_count",
            "bucket_selector",
            json!({"count": "_count"}),
        )
        .script("params.count > 1");

        assert_eq!(
            pipeline.to_json(),
            json!({
                "bucket_selector": {
                    "buckets_path": {"count": "_count"},
                    "script": "params.count > 1"
                }
            })
        );
    }
}
