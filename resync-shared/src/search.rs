//! Search request and response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Default number of hits returned per query.
const DEFAULT_LIMIT: usize = 10;

/// A query-string search against the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Query text in query-string syntax.
    pub query: String,
    /// Maximum number of hits returned. `total` is unaffected.
    pub limit: usize,
}

impl SearchQuery {
    /// Create a query-string search.
    pub fn query_string(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: DEFAULT_LIMIT,
        }
    }

    /// Set the maximum number of hits returned.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Lowercased terms of the query, used by engines without an analyzer.
    pub fn terms(&self) -> Vec<String> {
        tokenize(&self.query)
    }
}

/// Split text into lowercase alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// A single matching document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: Uuid,
    pub score: f64,
    pub source: Value,
}

/// The result of a search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Total number of matching documents.
    pub total: u64,
    /// The top hits, at most `limit` of them.
    pub hits: Vec<SearchHit>,
}

impl SearchResponse {
    /// A response with no hits.
    pub fn empty() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terms() {
        let query = SearchQuery::query_string("American  Psycho!");
        assert_eq!(query.terms(), vec!["american", "psycho"]);
        assert_eq!(query.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("  --  ").is_empty());
    }
}
