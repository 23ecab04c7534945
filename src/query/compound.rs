//! Composite queries other than bool: filtered, nested and function score.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::query::Query;

/// A scoring query restricted by a non-scoring filter.
///
/// Either side may be missing, but not both.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredQuery {
    pub query: Option<Box<Query>>,
    pub filter: Option<Box<Query>>,
    pub name: Option<String>,
    pub boost: f64,
}

impl FilteredQuery {
    /// Create a filtered query, or `None` when both sides are absent.
    pub fn new(query: Option<Query>, filter: Option<Query>) -> Option<Self> {
        let filtered = FilteredQuery {
            query: query.map(Box::new),
            filter: filter.map(Box::new),
            name: None,
            boost: 1.0,
        };
        filtered.is_valid().then_some(filtered)
    }

    /// Whether the node carries any content.
    pub fn is_valid(&self) -> bool {
        self.query.is_some() || self.filter.is_some()
    }

    pub fn query(&self) -> Option<&Query> {
        self.query.as_deref()
    }

    pub fn filter(&self) -> Option<&Query> {
        self.filter.as_deref()
    }
}

/// How matching nested documents contribute to the parent score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMode {
    #[default]
    Avg,
    Sum,
    Min,
    Max,
    None,
}

impl ScoreMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreMode::Avg => "avg",
            ScoreMode::Sum => "sum",
            ScoreMode::Min => "min",
            ScoreMode::Max => "max",
            ScoreMode::None => "none",
        }
    }
}

/// Runs a query against nested documents under a path.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedQuery {
    pub path: String,
    pub score_mode: ScoreMode,
    pub query: Box<Query>,
    pub name: Option<String>,
    pub boost: f64,
}

impl NestedQuery {
    pub fn new<P: Into<String>, Q: Into<Query>>(path: P, query: Q) -> Self {
        NestedQuery {
            path: path.into(),
            score_mode: ScoreMode::default(),
            query: Box::new(query.into()),
            name: None,
            boost: 1.0,
        }
    }

    pub fn score_mode(mut self, score_mode: ScoreMode) -> Self {
        self.score_mode = score_mode;
        self
    }
}

/// How the scores of several functions are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionScoreMode {
    #[default]
    Multiply,
    Sum,
    Avg,
    First,
    Max,
    Min,
}

impl FunctionScoreMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionScoreMode::Multiply => "multiply",
            FunctionScoreMode::Sum => "sum",
            FunctionScoreMode::Avg => "avg",
            FunctionScoreMode::First => "first",
            FunctionScoreMode::Max => "max",
            FunctionScoreMode::Min => "min",
        }
    }
}

/// How the function score is combined with the query score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoostMode {
    #[default]
    Multiply,
    Replace,
    Sum,
    Avg,
    Max,
    Min,
}

impl BoostMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoostMode::Multiply => "multiply",
            BoostMode::Replace => "replace",
            BoostMode::Sum => "sum",
            BoostMode::Avg => "avg",
            BoostMode::Max => "max",
            BoostMode::Min => "min",
        }
    }
}

/// Filter restricting a score function.
///
/// Functions may arrive already compiled; both forms are accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionFilter {
    Query(Box<Query>),
    Compiled(Value),
}

/// One scoring function of a function score query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScoreFunction {
    pub filter: Option<FunctionFilter>,
    pub weight: Option<f64>,
    /// The function itself, e.g. `{"field_value_factor": {...}}`.
    pub body: Map<String, Value>,
}

impl ScoreFunction {
    /// Create a function from its body.
    pub fn new(body: Map<String, Value>) -> Self {
        ScoreFunction {
            filter: None,
            weight: None,
            body,
        }
    }

    /// A plain weight function.
    pub fn weight(weight: f64) -> Self {
        ScoreFunction {
            weight: Some(weight),
            ..Default::default()
        }
    }

    pub fn with_filter<Q: Into<Query>>(mut self, filter: Q) -> Self {
        self.filter = Some(FunctionFilter::Query(Box::new(filter.into())));
        self
    }
}

/// Modifies the score of documents matched by a query.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionScoreQuery {
    pub query: Option<Box<Query>>,
    pub functions: Vec<ScoreFunction>,
    pub score_mode: FunctionScoreMode,
    pub boost_mode: BoostMode,
    pub name: Option<String>,
    pub boost: f64,
}

impl FunctionScoreQuery {
    pub fn new(query: Option<Query>) -> Self {
        FunctionScoreQuery {
            query: query.map(Box::new),
            functions: Vec::new(),
            score_mode: FunctionScoreMode::default(),
            boost_mode: BoostMode::default(),
            name: None,
            boost: 1.0,
        }
    }

    pub fn function(mut self, function: ScoreFunction) -> Self {
        self.functions.push(function);
        self
    }
}
