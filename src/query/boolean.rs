//! Boolean composition of queries.

use crate::query::{MinimumShouldMatch, Query};

/// A query combining child queries by clause.
///
/// An empty bool is still a valid node; whether it is useful is up to the
/// caller.
#[derive(Debug, Clone, PartialEq)]
pub struct BoolQuery {
    pub must: Vec<Query>,
    pub should: Vec<Query>,
    pub must_not: Vec<Query>,
    /// Only emitted when `should` is non-empty.
    pub minimum_should_match: MinimumShouldMatch,
    pub name: Option<String>,
    pub boost: f64,
}

impl BoolQuery {
    /// Create an empty bool query.
    pub fn new() -> Self {
        BoolQuery {
            must: Vec::new(),
            should: Vec::new(),
            must_not: Vec::new(),
            minimum_should_match: MinimumShouldMatch::default(),
            name: None,
            boost: 1.0,
        }
    }

    /// Add a required clause.
    pub fn must<Q: Into<Query>>(mut self, query: Q) -> Self {
        self.must.push(query.into());
        self
    }

    /// Add an optional clause.
    pub fn should<Q: Into<Query>>(mut self, query: Q) -> Self {
        self.should.push(query.into());
        self
    }

    /// Add a prohibited clause.
    pub fn must_not<Q: Into<Query>>(mut self, query: Q) -> Self {
        self.must_not.push(query.into());
        self
    }

    pub fn minimum_should_match<M: Into<MinimumShouldMatch>>(mut self, msm: M) -> Self {
        self.minimum_should_match = msm.into();
        self
    }

    /// Whether all three clause lists are empty.
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty() && self.must_not.is_empty()
    }

    /// Total number of clauses.
    pub fn clause_count(&self) -> usize {
        self.must.len() + self.should.len() + self.must_not.len()
    }
}

impl Default for BoolQuery {
    fn default() -> Self {
        Self::new()
    }
}

/// Matches documents the inner query does not match.
#[derive(Debug, Clone, PartialEq)]
pub struct NotQuery {
    pub query: Box<Query>,
    pub name: Option<String>,
    pub boost: f64,
}

impl NotQuery {
    pub fn new<Q: Into<Query>>(query: Q) -> Self {
        NotQuery {
            query: Box::new(query.into()),
            name: None,
            boost: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::TermQuery;

    #[test]
    fn test_bool_builder() {
        let query = BoolQuery::new()
            .must(TermQuery::new("brand", "acme"))
            .should(TermQuery::new("color", "red"))
            .should(TermQuery::new("color", "blue"))
            .minimum_should_match(2);

        assert_eq!(query.must.len(), 1);
        assert_eq!(query.should.len(), 2);
        assert_eq!(query.clause_count(), 3);
        assert_eq!(query.minimum_should_match, MinimumShouldMatch::Count(2));
        assert!(!query.is_empty());
    }

    #[test]
    fn test_empty_bool() {
        let query = BoolQuery::default();
        assert!(query.is_empty());
        assert_eq!(query.boost, 1.0);
    }
}
