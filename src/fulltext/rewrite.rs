//! Query text rewriting (synonyms, expansions).
//!
//! A rewriter proposes alternative texts with a weight. Callers expand the
//! query text into weighted alternatives before fulltext assembly.

use std::collections::BTreeMap;

use ahash::AHashMap;
use unicode_segmentation::UnicodeSegmentation;

use crate::fulltext::{QueryText, WeightedQueryText};

/// Rewritten text to weight.
pub type Rewrites = BTreeMap<String, f64>;

/// Proposes rewrites of a query text.
pub trait QueryRewriter: Send + Sync {
    fn rewrites(&self, text: &str) -> Rewrites;
}

fn default_synonym_weight() -> f64 {
    0.5
}

/// Word-level synonym substitution from an in-memory table.
#[derive(Debug, Clone)]
pub struct SynonymRewriter {
    synonyms: AHashMap<String, Vec<String>>,
    weight: f64,
}

impl Default for SynonymRewriter {
    fn default() -> Self {
        SynonymRewriter {
            synonyms: AHashMap::new(),
            weight: default_synonym_weight(),
        }
    }
}

impl SynonymRewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Weight given to every rewrite.
    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Register a group of mutually equivalent words.
    pub fn synonym_group<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: Vec<String> = words.into_iter().map(|w| w.as_ref().to_lowercase()).collect();
        for word in &words {
            let entry = self.synonyms.entry(word.clone()).or_default();
            for other in words.iter().filter(|other| *other != word) {
                if !entry.contains(other) {
                    entry.push(other.clone());
                }
            }
        }
        self
    }
}

impl QueryRewriter for SynonymRewriter {
    fn rewrites(&self, text: &str) -> Rewrites {
        let words: Vec<String> = text.unicode_words().map(str::to_lowercase).collect();
        let mut rewrites = Rewrites::new();

        for (position, word) in words.iter().enumerate() {
            let Some(synonyms) = self.synonyms.get(word) else {
                continue;
            };
            for synonym in synonyms {
                let mut rewritten = words.clone();
                rewritten[position] = synonym.clone();
                rewrites.insert(rewritten.join(" "), self.weight);
            }
        }

        rewrites
    }
}

/// Expand a query text with its rewrites.
///
/// The original text keeps weight 1. Returns the plain text when nothing was
/// rewritten.
pub fn expand_query_text(rewriter: &dyn QueryRewriter, text: &str) -> QueryText {
    let rewrites = rewriter.rewrites(text);
    if rewrites.is_empty() {
        return QueryText::from(text);
    }

    let mut alternatives = vec![WeightedQueryText::new(text, 1.0)];
    alternatives.extend(
        rewrites
            .into_iter()
            .filter(|(rewritten, _)| rewritten != text)
            .map(|(rewritten, weight)| WeightedQueryText::new(rewritten, weight)),
    );
    QueryText::Alternatives(alternatives)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synonym_rewrites() {
        let rewriter = SynonymRewriter::new().synonym_group(["sneakers", "trainers"]);
        let rewrites = rewriter.rewrites("Red Sneakers");

        assert_eq!(rewrites.len(), 1);
        assert_eq!(rewrites.get("red trainers"), Some(&0.5));
    }

    #[test]
    fn test_expand_without_rewrites() {
        let rewriter = SynonymRewriter::new();
        assert_eq!(
            expand_query_text(&rewriter, "red shoes"),
            QueryText::from("red shoes")
        );
    }

    #[test]
    fn test_expand_with_rewrites() {
        let rewriter = SynonymRewriter::new()
            .weight(0.8)
            .synonym_group(["tee", "t-shirt", "tshirt"]);

        match expand_query_text(&rewriter, "blue tee") {
            QueryText::Alternatives(alternatives) => {
                assert_eq!(alternatives.len(), 3);
                assert_eq!(alternatives[0], WeightedQueryText::new("blue tee", 1.0));
                assert!(alternatives.iter().skip(1).all(|alt| alt.weight == 0.8));
            }
            other => panic!("expected alternatives, got {other:?}"),
        }
    }
}
