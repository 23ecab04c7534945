//! Field mapping of the searched index.
//!
//! The compiler only reads the mapping. [`FieldMapping`] is the seam; [`Mapping`]
//! is an in-memory implementation loadable from JSON.

pub mod field;
pub mod filter;

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::query::WeightedFields;

pub use self::field::{Analyzer, Field, FieldType};
pub use self::filter::{FieldFilter, FuzzyFieldFilter, SearchableFieldFilter, SpannableFieldFilter};

/// Catch-all field every searchable field is copied into.
pub const DEFAULT_SEARCH_FIELD: &str = "search";

/// Catch-all field used for fuzzy and phonetic matching.
pub const DEFAULT_SPELLING_FIELD: &str = "spelling";

/// Property of a catch-all field for `analyzer`.
pub fn default_search_property(field: &str, analyzer: Analyzer) -> String {
    if analyzer == Analyzer::Standard {
        field.to_string()
    } else {
        format!("{field}.{analyzer}")
    }
}

/// Read access to the fields of an index.
pub trait FieldMapping: Send + Sync + Debug {
    /// All mapped fields.
    fn fields(&self) -> &[Field];

    /// Weighted properties to search for an analyzer.
    ///
    /// The catch-all `default_field`, when given, is included at weight `boost`.
    /// Fields passing `field_filter` are then added at `boost * search_weight`,
    /// except that with a catch-all present, fields already covered by it
    /// (weight 1, standard analysis) are left out. Without an explicit
    /// analyzer each field uses its default search analyzer.
    fn weighted_search_properties(
        &self,
        analyzer: Option<Analyzer>,
        default_field: Option<&str>,
        boost: f64,
        field_filter: Option<&dyn FieldFilter>,
    ) -> WeightedFields {
        let mut weighted = WeightedFields::new();

        if let Some(default_field) = default_field {
            let property =
                default_search_property(default_field, analyzer.unwrap_or(Analyzer::Standard));
            weighted.insert(property, boost);
        }

        let fields = self
            .fields()
            .iter()
            .filter(|field| field_filter.is_none_or(|filter| filter.filter_field(field)));

        for field in fields {
            let mut can_add = default_field.is_none() || field.search_weight != 1.0;
            let current = match analyzer {
                Some(analyzer) => analyzer,
                None => {
                    can_add = can_add || field.default_search_analyzer != Analyzer::Standard;
                    field.default_search_analyzer
                }
            };

            if !can_add {
                continue;
            }
            if let Some(property) = field.mapping_property(current) {
                weighted.insert(property, boost * field.search_weight);
            }
        }

        weighted
    }
}

/// In-memory field mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    fields: Vec<Field>,
}

impl Mapping {
    pub fn new(fields: Vec<Field>) -> Self {
        Mapping { fields }
    }

    /// Load a mapping from `{"fields": [...]}`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }
}

impl FieldMapping for Mapping {
    fn fields(&self) -> &[Field] {
        &self.fields
    }
}
