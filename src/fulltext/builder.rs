//! Fulltext query builder.
//!
//! The assembled query depends on the spelling classification of the text:
//!
//! * a list of alternatives becomes a bool `should` over each alternative;
//! * pure stop words become a single strict multi-match on phrase fields;
//! * fuzzy texts match the spelling field fuzzily and/or phonetically;
//! * everything else (and fuzzy texts when neither fuzzy nor phonetic matching
//!   is enabled) becomes the exact query: a weighted multi-match filtered by a
//!   cutoff frequency multi-match.
//!
//! When span matching is enabled, documents whose text starts with the first
//! query words get an extra, optional, span clause.

use log::trace;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::CompilerConfig;
use crate::error::{HalberdError, Result};
use crate::fulltext::{ContainerConfiguration, QueryText, SpellingType};
use crate::mapping::{
    Analyzer, FieldFilter, FuzzyFieldFilter, SearchableFieldFilter, SpannableFieldFilter,
};
use crate::query::{
    BoolQuery, FilteredQuery, FuzzinessConfig, MultiMatchQuery, Query, SpanFirstQuery,
    SpanNearQuery, SpanQuery, SpanTermQuery, WeightedFields,
};

/// Name of the query built for stop-word-only texts.
pub const PURE_STOPWORDS_QUERY_NAME: &str = "PURE_STOPWORDS";

/// Name of the fuzzy and phonetic query.
pub const SPELLCHECK_QUERY_NAME: &str = "SPELLCHECK";

/// Name of the exact query.
pub const EXACT_QUERY_NAME: &str = "EXACT";

fn word_count(text: &str) -> usize {
    text.unicode_words().count()
}

/// Analyzer matching word sequences: shingles for several words.
fn phrase_analyzer(text: &str) -> Analyzer {
    if word_count(text) > 1 {
        Analyzer::Shingle
    } else {
        Analyzer::Whitespace
    }
}

/// Builds fulltext queries for a search container.
#[derive(Debug, Clone, Default)]
pub struct FulltextQueryBuilder {
    config: CompilerConfig,
}

impl FulltextQueryBuilder {
    pub fn new(config: CompilerConfig) -> Self {
        FulltextQueryBuilder { config }
    }

    /// Build the query for a text.
    pub fn create(
        &self,
        container: &ContainerConfiguration,
        query_text: &QueryText,
        spelling_type: SpellingType,
        boost: f64,
    ) -> Result<Query> {
        self.assemble(container, query_text, spelling_type, boost, 0)
    }

    /// Build the query for a text found `depth` alternatives deep.
    pub fn assemble(
        &self,
        container: &ContainerConfiguration,
        query_text: &QueryText,
        spelling_type: SpellingType,
        boost: f64,
        depth: usize,
    ) -> Result<Query> {
        if depth > self.config.max_fulltext_depth {
            return Err(HalberdError::RecursionLimit(self.config.max_fulltext_depth));
        }

        let text = match query_text {
            QueryText::Text(text) => text.as_str(),
            QueryText::Alternatives(alternatives) if alternatives.is_empty() => {
                return Err(HalberdError::invalid_query(
                    "fulltext alternatives must not be empty",
                ));
            }
            QueryText::Alternatives(alternatives) => {
                let mut query = BoolQuery::new();
                for alternative in alternatives {
                    query.should.push(self.assemble(
                        container,
                        &alternative.text,
                        spelling_type,
                        alternative.weight,
                        depth + 1,
                    )?);
                }
                query.boost = boost;
                return Ok(query.into());
            }
        };

        trace!("assembling {spelling_type} query for {text:?} in {}", container.name);

        let query = match spelling_type {
            SpellingType::PureStopwords => Some(self.pure_stopwords_query(container, text)),
            SpellingType::Fuzzy | SpellingType::MostFuzzy => {
                self.spellchecked_query(container, text, spelling_type)
            }
            SpellingType::Exact | SpellingType::MostExact => None,
        };
        let mut query = query.unwrap_or_else(|| self.exact_query(container, text));

        if container.relevance.span.is_enabled()
            && let Some(span) = self.span_query(container, text)
        {
            query = BoolQuery::new()
                .must(query)
                .should(span)
                .minimum_should_match(0)
                .into();
        }

        query.set_boost(boost);
        Ok(query)
    }

    fn weighted_fields(
        &self,
        container: &ContainerConfiguration,
        analyzer: Option<Analyzer>,
        default_field: Option<&str>,
        boost: f64,
        filter: &dyn FieldFilter,
    ) -> WeightedFields {
        container
            .mapping()
            .weighted_search_properties(analyzer, default_field, boost, Some(filter))
    }

    fn pure_stopwords_query(&self, container: &ContainerConfiguration, text: &str) -> Query {
        let fields = self.weighted_fields(
            container,
            Some(phrase_analyzer(text)),
            Some(self.config.search_field.as_str()),
            1.0,
            &SearchableFieldFilter,
        );

        let query = MultiMatchQuery::new(text, fields)
            .minimum_should_match("100%")
            .tie_breaker(container.relevance.tie_breaker);
        Query::from(query).named(PURE_STOPWORDS_QUERY_NAME)
    }

    fn spellchecked_query(
        &self,
        container: &ContainerConfiguration,
        text: &str,
        spelling_type: SpellingType,
    ) -> Option<Query> {
        let relevance = &container.relevance;
        let mut query = BoolQuery::new();

        if let Some(fuzziness) = &relevance.fuzziness {
            query.should.push(self.fuzzy_query(container, text, fuzziness));
        }
        if let Some(phonetic) = &relevance.phonetic {
            query
                .should
                .push(self.phonetic_query(container, text, phonetic.fuzziness.as_ref()));
        }
        if query.should.is_empty() {
            return None;
        }

        if spelling_type == SpellingType::MostFuzzy {
            query.must.push(self.weighted_search_query(container, text).into());
        }

        Some(Query::from(query).named(SPELLCHECK_QUERY_NAME))
    }

    fn fuzzy_query(
        &self,
        container: &ContainerConfiguration,
        text: &str,
        fuzziness: &FuzzinessConfig,
    ) -> Query {
        let spelling_field = Some(self.config.spelling_field.as_str());
        let mut fields = self.weighted_fields(
            container,
            Some(Analyzer::Whitespace),
            spelling_field,
            1.0,
            &FuzzyFieldFilter,
        );
        fields.extend(self.weighted_fields(
            container,
            Some(phrase_analyzer(text)),
            spelling_field,
            1.0,
            &FuzzyFieldFilter,
        ));

        let relevance = &container.relevance;
        MultiMatchQuery::new(text, fields)
            .minimum_should_match("100%")
            .tie_breaker(relevance.tie_breaker)
            .cutoff_frequency(relevance.cutoff_frequency)
            .fuzziness(fuzziness.clone())
            .into()
    }

    fn phonetic_query(
        &self,
        container: &ContainerConfiguration,
        text: &str,
        fuzziness: Option<&FuzzinessConfig>,
    ) -> Query {
        let fields = self.weighted_fields(
            container,
            Some(Analyzer::Phonetic),
            Some(self.config.spelling_field.as_str()),
            1.0,
            &FuzzyFieldFilter,
        );

        let relevance = &container.relevance;
        let mut query = MultiMatchQuery::new(text, fields)
            .minimum_should_match("100%")
            .tie_breaker(relevance.tie_breaker)
            .cutoff_frequency(relevance.cutoff_frequency);
        query.fuzziness = fuzziness.cloned();
        query.into()
    }

    fn exact_query(&self, container: &ContainerConfiguration, text: &str) -> Query {
        let filtered = FilteredQuery {
            query: Some(Box::new(self.weighted_search_query(container, text).into())),
            filter: Some(Box::new(self.cutoff_frequency_query(container, text).into())),
            name: None,
            boost: 1.0,
        };
        Query::from(filtered).named(EXACT_QUERY_NAME)
    }

    /// Multi-match over plain, phrase and sortable field groups.
    fn weighted_search_query(
        &self,
        container: &ContainerConfiguration,
        text: &str,
    ) -> MultiMatchQuery {
        let relevance = &container.relevance;
        let search_field = Some(self.config.search_field.as_str());

        let (phrase_boost, sortable_boost) = match &relevance.single_term_boosts {
            Some(single) if word_count(text) == 1 => {
                (single.phrase_match_boost, single.sortable_match_boost)
            }
            _ => (relevance.phrase_match_boost, 2.0 * relevance.phrase_match_boost),
        };

        let mut fields =
            self.weighted_fields(container, None, search_field, 1.0, &SearchableFieldFilter);
        if phrase_boost > 0.0 {
            fields.extend(self.weighted_fields(
                container,
                Some(phrase_analyzer(text)),
                search_field,
                phrase_boost,
                &SearchableFieldFilter,
            ));
        }
        if sortable_boost > 0.0 {
            fields.extend(self.weighted_fields(
                container,
                Some(Analyzer::Sortable),
                None,
                sortable_boost,
                &SearchableFieldFilter,
            ));
        }

        MultiMatchQuery::new(text, fields)
            .minimum_should_match(1)
            .cutoff_frequency(relevance.cutoff_frequency)
            .tie_breaker(relevance.tie_breaker)
    }

    /// Filter requiring enough non-common words to match.
    fn cutoff_frequency_query(
        &self,
        container: &ContainerConfiguration,
        text: &str,
    ) -> MultiMatchQuery {
        let relevance = &container.relevance;
        let fields = self
            .weighted_fields(
                container,
                None,
                Some(self.config.search_field.as_str()),
                1.0,
                &SearchableFieldFilter,
            )
            .into_keys()
            .map(|field| (field, 1.0))
            .collect();

        MultiMatchQuery::new(text, fields)
            .minimum_should_match(relevance.minimum_should_match.clone())
            .cutoff_frequency(relevance.cutoff_frequency)
            .tie_breaker(relevance.tie_breaker)
    }

    /// Span-first query on the leading words, one per spannable field.
    fn span_query(&self, container: &ContainerConfiguration, text: &str) -> Option<Query> {
        let span = &container.relevance.span;
        let terms: Vec<String> = text
            .unicode_words()
            .take(span.span_size)
            .map(str::to_lowercase)
            .collect();
        if terms.is_empty() {
            return None;
        }

        let mut queries: Vec<Query> = container
            .mapping()
            .fields()
            .iter()
            .filter(|field| SpannableFieldFilter.filter_field(field))
            .map(|field| {
                let mut clauses: Vec<SpanQuery> = terms
                    .iter()
                    .map(|term| SpanTermQuery::new(field.name.as_str(), term.as_str()).into())
                    .collect();
                let inner = if clauses.len() == 1 {
                    clauses.remove(0)
                } else {
                    SpanNearQuery::new(clauses, 0, true).into()
                };
                SpanFirstQuery::new(inner, terms.len() as u32)
                    .boost(span.span_match_boost * field.search_weight)
                    .into()
            })
            .collect();

        match queries.len() {
            0 => None,
            1 => queries.pop(),
            _ => {
                let mut query = BoolQuery::new();
                query.should = queries;
                Some(query.into())
            }
        }
    }
}
