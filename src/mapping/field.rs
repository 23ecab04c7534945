//! Field definitions of an index mapping.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Data type of a mapped field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    #[default]
    Keyword,
    Integer,
    Long,
    Double,
    Boolean,
    Date,
    Object,
    Nested,
}

/// Analyzers a text field may be indexed with.
///
/// Every analyzer but the standard one is indexed as a subfield named
/// `<field>.<analyzer>`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Analyzer {
    #[default]
    Standard,
    Whitespace,
    Shingle,
    Sortable,
    Phonetic,
    Reference,
    Untouched,
    EdgeNgram,
}

impl Analyzer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Analyzer::Standard => "standard",
            Analyzer::Whitespace => "whitespace",
            Analyzer::Shingle => "shingle",
            Analyzer::Sortable => "sortable",
            Analyzer::Phonetic => "phonetic",
            Analyzer::Reference => "reference",
            Analyzer::Untouched => "untouched",
            Analyzer::EdgeNgram => "edge_ngram",
        }
    }
}

impl fmt::Display for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_search_weight() -> f64 {
    1.0
}

/// A mapped field and its search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub is_searchable: bool,
    #[serde(default = "default_search_weight")]
    pub search_weight: f64,
    #[serde(default)]
    pub nested_path: Option<String>,
    #[serde(default)]
    pub is_used_in_spellcheck: bool,
    #[serde(default)]
    pub is_used_for_sort: bool,
    #[serde(default)]
    pub default_search_analyzer: Analyzer,
    /// Extra analyzers indexed as subfields.
    #[serde(default)]
    pub analyzers: Vec<Analyzer>,
}

impl Field {
    pub fn new<N: Into<String>>(name: N, field_type: FieldType) -> Self {
        Field {
            name: name.into(),
            field_type,
            is_searchable: false,
            search_weight: 1.0,
            nested_path: None,
            is_used_in_spellcheck: false,
            is_used_for_sort: false,
            default_search_analyzer: Analyzer::Standard,
            analyzers: Vec::new(),
        }
    }

    /// A searchable text field with the given subfield analyzers.
    pub fn text<N: Into<String>>(name: N, analyzers: &[Analyzer]) -> Self {
        let mut field = Field::new(name, FieldType::Text).searchable(1.0);
        field.analyzers = analyzers.to_vec();
        field
    }

    pub fn searchable(mut self, weight: f64) -> Self {
        self.is_searchable = true;
        self.search_weight = weight;
        self
    }

    pub fn spellcheck(mut self) -> Self {
        self.is_used_in_spellcheck = true;
        self
    }

    pub fn sortable(mut self) -> Self {
        self.is_used_for_sort = true;
        self
    }

    pub fn nested<P: Into<String>>(mut self, path: P) -> Self {
        self.nested_path = Some(path.into());
        self
    }

    pub fn default_analyzer(mut self, analyzer: Analyzer) -> Self {
        self.default_search_analyzer = analyzer;
        self
    }

    pub fn is_nested(&self) -> bool {
        self.nested_path.is_some()
    }

    /// Indexed property answering for `analyzer`, if any.
    ///
    /// Text fields answer for the standard analyzer on the field itself and for
    /// each extra analyzer on a subfield. Other fields are indexed untouched and
    /// answer only for that.
    pub fn mapping_property(&self, analyzer: Analyzer) -> Option<String> {
        if self.field_type != FieldType::Text {
            return (analyzer == Analyzer::Untouched).then(|| self.name.clone());
        }
        if analyzer == Analyzer::Standard {
            return Some(self.name.clone());
        }
        self.analyzers
            .contains(&analyzer)
            .then(|| format!("{}.{}", self.name, analyzer))
    }
}
