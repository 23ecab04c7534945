//! Sort orders.
//!
//! A sort order is either a plain field sort or a sort on a field of nested
//! documents, optionally restricted by a filter on those documents.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::Query;

/// Field name sorting by relevance score.
pub const SCORE_FIELD: &str = "_score";

/// Missing-value placement before all other values.
pub const MISSING_FIRST: &str = "_first";

/// Missing-value placement after all other values.
pub const MISSING_LAST: &str = "_last";

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    /// Where missing values go when none is configured.
    pub fn default_missing(&self) -> &'static str {
        match self {
            SortDirection::Asc => MISSING_LAST,
            SortDirection::Desc => MISSING_FIRST,
        }
    }
}

/// How several nested values of one document reduce to a sort key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    Min,
    Max,
    Sum,
    Avg,
    Median,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Min => "min",
            SortMode::Max => "max",
            SortMode::Sum => "sum",
            SortMode::Avg => "avg",
            SortMode::Median => "median",
        }
    }
}

/// Sort on a top-level field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardSortOrder {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
    #[serde(default)]
    pub missing: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
}

impl StandardSortOrder {
    pub fn new<F: Into<String>>(field: F, direction: SortDirection) -> Self {
        StandardSortOrder {
            field: field.into(),
            direction,
            missing: None,
            name: None,
        }
    }
}

/// Sort on a field of nested documents.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedSortOrder {
    pub field: String,
    pub direction: SortDirection,
    pub missing: Option<Value>,
    pub nested_path: String,
    /// Restricts which nested documents take part in the sort.
    pub nested_filter: Option<Query>,
    pub score_mode: SortMode,
    pub name: Option<String>,
}

impl NestedSortOrder {
    pub fn new<F, P>(field: F, direction: SortDirection, nested_path: P) -> Self
    where
        F: Into<String>,
        P: Into<String>,
    {
        NestedSortOrder {
            field: field.into(),
            direction,
            missing: None,
            nested_path: nested_path.into(),
            nested_filter: None,
            score_mode: SortMode::default(),
            name: None,
        }
    }

    pub fn with_filter<Q: Into<Query>>(mut self, filter: Q) -> Self {
        self.nested_filter = Some(filter.into());
        self
    }
}

/// A sort order.
#[derive(Debug, Clone, PartialEq)]
pub enum SortOrder {
    Standard(StandardSortOrder),
    Nested(NestedSortOrder),
}

impl SortOrder {
    pub fn field(&self) -> &str {
        match self {
            SortOrder::Standard(s) => &s.field,
            SortOrder::Nested(n) => &n.field,
        }
    }

    pub fn direction(&self) -> SortDirection {
        match self {
            SortOrder::Standard(s) => s.direction,
            SortOrder::Nested(n) => n.direction,
        }
    }

    /// Configured missing placement, or the direction's default.
    ///
    /// Sorting on the score has no missing values.
    pub fn missing(&self) -> Option<Value> {
        if self.field() == SCORE_FIELD {
            return None;
        }
        let configured = match self {
            SortOrder::Standard(s) => s.missing.clone(),
            SortOrder::Nested(n) => n.missing.clone(),
        };
        Some(configured.unwrap_or_else(|| Value::from(self.direction().default_missing())))
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, SortOrder::Nested(_))
    }
}

impl From<StandardSortOrder> for SortOrder {
    fn from(order: StandardSortOrder) -> Self {
        SortOrder::Standard(order)
    }
}

impl From<NestedSortOrder> for SortOrder {
    fn from(order: NestedSortOrder) -> Self {
        SortOrder::Nested(order)
    }
}
