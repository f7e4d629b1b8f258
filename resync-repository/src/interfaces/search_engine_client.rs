//! Search engine client trait definition.
//!
//! This module defines the abstract interface for search engine operations,
//! allowing for different backend implementations (OpenSearch, in-memory, etc.).

use async_trait::async_trait;

use crate::errors::SearchError;
use resync_shared::{IndexableDocument, SearchQuery, SearchResponse};

/// Abstract interface for search engine operations.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`: a single client is shared by
/// every concurrent worker of a synchronization run.
///
/// # Refresh Semantics
///
/// Indexing is near-real-time. A successfully indexed document is not
/// guaranteed to appear in `search` results until the index is refreshed,
/// either explicitly through [`SearchEngineClient::refresh`] or by the
/// engine's own refresh interval.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Execute a query-string search against the index.
    ///
    /// # Returns
    ///
    /// * `Ok(SearchResponse)` - The total hit count and the top hits
    /// * `Err(SearchError)` - If the search fails
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SearchError>;

    /// Index a single document, replacing any document with the same id.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the engine acknowledged the document
    /// * `Err(SearchError::Rejected)` - If the engine refused the document
    /// * `Err(SearchError)` - On transport failure
    async fn index_document(&self, document: &IndexableDocument) -> Result<(), SearchError>;

    /// Ensure the search index exists with proper mappings.
    ///
    /// Idempotent: an existing index is left untouched.
    async fn ensure_index_exists(&self) -> Result<(), SearchError>;

    /// Delete the search index if it exists.
    ///
    /// Idempotent: a missing index is not an error.
    async fn delete_index_if_exists(&self) -> Result<(), SearchError>;

    /// Make every acknowledged document visible to search.
    async fn refresh(&self) -> Result<(), SearchError>;

    /// Check if the search engine is healthy and reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the search engine is healthy
    /// * `Ok(false)` - If the search engine is unhealthy
    /// * `Err(SearchError)` - If the health check fails to execute
    async fn health_check(&self) -> Result<bool, SearchError>;
}
