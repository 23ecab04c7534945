//! Spelling classification of query text.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::HalberdError;

/// How well the query text is spelled, relative to the indexed vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellingType {
    /// Every word is known.
    #[default]
    Exact,
    /// Most words are known.
    MostExact,
    /// Most words are unknown.
    MostFuzzy,
    /// No word is known.
    Fuzzy,
    /// Only stop words.
    PureStopwords,
}

impl SpellingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpellingType::Exact => "exact",
            SpellingType::MostExact => "most_exact",
            SpellingType::MostFuzzy => "most_fuzzy",
            SpellingType::Fuzzy => "fuzzy",
            SpellingType::PureStopwords => "pure_stopwords",
        }
    }

    pub fn is_fuzzy(&self) -> bool {
        matches!(self, SpellingType::Fuzzy | SpellingType::MostFuzzy)
    }
}

impl fmt::Display for SpellingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpellingType {
    type Err = HalberdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(SpellingType::Exact),
            "most_exact" => Ok(SpellingType::MostExact),
            "most_fuzzy" => Ok(SpellingType::MostFuzzy),
            "fuzzy" => Ok(SpellingType::Fuzzy),
            "pure_stopwords" => Ok(SpellingType::PureStopwords),
            _ => Err(HalberdError::config(format!("unknown spelling type: {s}"))),
        }
    }
}

/// Classifies query text.
pub trait Spellchecker: Send + Sync {
    fn spelling_type(&self, text: &str) -> SpellingType;
}

/// Default English stop words list.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

static DEFAULT_STOP_WORDS_SET: LazyLock<AHashSet<String>> =
    LazyLock::new(|| DEFAULT_STOP_WORDS.iter().map(|s| s.to_string()).collect());

/// Classifies text from a stop word list and an optional known vocabulary.
///
/// Without a vocabulary every non stop word text is exact.
#[derive(Debug, Clone)]
pub struct StopwordSpellchecker {
    stop_words: AHashSet<String>,
    vocabulary: Option<AHashSet<String>>,
}

impl Default for StopwordSpellchecker {
    fn default() -> Self {
        StopwordSpellchecker {
            stop_words: DEFAULT_STOP_WORDS_SET.clone(),
            vocabulary: None,
        }
    }
}

impl StopwordSpellchecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stop_words<I, S>(stop_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        StopwordSpellchecker {
            stop_words: stop_words
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
            vocabulary: None,
        }
    }

    /// Words known to the index.
    pub fn vocabulary<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.vocabulary = Some(words.into_iter().map(|s| s.as_ref().to_lowercase()).collect());
        self
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(&word.to_lowercase())
    }
}

impl Spellchecker for StopwordSpellchecker {
    fn spelling_type(&self, text: &str) -> SpellingType {
        let words: Vec<String> = text.unicode_words().map(str::to_lowercase).collect();
        let content: Vec<&String> = words
            .iter()
            .filter(|w| !self.stop_words.contains(w.as_str()))
            .collect();

        if !words.is_empty() && content.is_empty() {
            return SpellingType::PureStopwords;
        }

        let Some(vocabulary) = &self.vocabulary else {
            return SpellingType::Exact;
        };

        let unknown = content
            .iter()
            .filter(|w| !vocabulary.contains(w.as_str()))
            .count();

        if unknown == 0 {
            SpellingType::Exact
        } else if unknown == content.len() {
            SpellingType::Fuzzy
        } else if unknown * 2 <= content.len() {
            SpellingType::MostExact
        } else {
            SpellingType::MostFuzzy
        }
    }
}
