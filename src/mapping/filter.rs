//! Field filters selecting which fields take part in a search.

use crate::mapping::{Field, FieldType};

/// Decides whether a field is used.
///
/// Any `Fn(&Field) -> bool` is a filter.
pub trait FieldFilter {
    fn filter_field(&self, field: &Field) -> bool;
}

impl<F> FieldFilter for F
where
    F: Fn(&Field) -> bool,
{
    fn filter_field(&self, field: &Field) -> bool {
        self(field)
    }
}

/// Searchable fields outside nested documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchableFieldFilter;

impl FieldFilter for SearchableFieldFilter {
    fn filter_field(&self, field: &Field) -> bool {
        field.is_searchable && !field.is_nested()
    }
}

/// Fields eligible for fuzzy and phonetic matching.
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyFieldFilter;

impl FieldFilter for FuzzyFieldFilter {
    fn filter_field(&self, field: &Field) -> bool {
        field.is_searchable && field.is_used_in_spellcheck && !field.is_nested()
    }
}

/// Text fields eligible for span (word position) matching.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpannableFieldFilter;

impl FieldFilter for SpannableFieldFilter {
    fn filter_field(&self, field: &Field) -> bool {
        field.field_type == FieldType::Text
            && field.is_searchable
            && field.is_used_in_spellcheck
            && !field.is_nested()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::Analyzer;

    #[test]
    fn test_builtin_filters() {
        let name = Field::text("name", &[Analyzer::Whitespace]).spellcheck();
        let sku = Field::new("sku", FieldType::Keyword).searchable(1.0);
        let offer = Field::text("offers.title", &[]).spellcheck().nested("offers");

        assert!(SearchableFieldFilter.filter_field(&name));
        assert!(SearchableFieldFilter.filter_field(&sku));
        assert!(!SearchableFieldFilter.filter_field(&offer));

        assert!(FuzzyFieldFilter.filter_field(&name));
        assert!(!FuzzyFieldFilter.filter_field(&sku));

        assert!(SpannableFieldFilter.filter_field(&name));
        assert!(!SpannableFieldFilter.filter_field(&offer));
    }

    #[test]
    fn test_closure_filter() {
        let heavy = |field: &Field| field.search_weight > 1.0;
        assert!(heavy.filter_field(&Field::text("name", &[]).searchable(3.0)));
        assert!(!heavy.filter_field(&Field::text("name", &[])));
    }
}
