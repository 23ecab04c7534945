//! Sort order serialization.

use serde_json::{Map, Value, json};

use crate::dsl::QueryCompiler;
use crate::error::Result;
use crate::sort::SortOrder;

/// Compiles sort orders into `{field: {"order", "missing", ...}}` entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortCompiler {
    queries: QueryCompiler,
}

impl SortCompiler {
    pub fn new() -> Self {
        SortCompiler::default()
    }

    pub fn compile(&self, order: &SortOrder) -> Result<Value> {
        let mut params = Map::new();
        params.insert("order".to_string(), json!(order.direction().as_str()));
        if let Some(missing) = order.missing() {
            params.insert("missing".to_string(), missing);
        }

        if let SortOrder::Nested(nested) = order {
            params.insert("mode".to_string(), json!(nested.score_mode.as_str()));
            let mut nested_params = Map::new();
            nested_params.insert("path".to_string(), json!(nested.nested_path));
            if let Some(filter) = &nested.nested_filter {
                nested_params.insert("filter".to_string(), self.queries.compile(filter)?);
            }
            params.insert("nested".to_string(), Value::Object(nested_params));
        }

        let mut document = Map::new();
        document.insert(order.field().to_string(), Value::Object(params));
        Ok(Value::Object(document))
    }

    /// Compile orders in sequence.
    pub fn compile_all(&self, orders: &[SortOrder]) -> Result<Vec<Value>> {
        orders.iter().map(|order| self.compile(order)).collect()
    }
}
