//! In-memory search engine with near-real-time visibility.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use crate::errors::SearchError;
use crate::interfaces::SearchEngineClient;
use resync_shared::{tokenize, IndexableDocument, SearchHit, SearchQuery, SearchResponse};

/// Default delay before an indexed document becomes searchable.
const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct StoredDocument {
    document: IndexableDocument,
    /// Body as of the index request, so hits keep their `indexed_at`.
    source: Value,
    tokens: Vec<String>,
    visible_at: Instant,
}

/// Search engine double that mimics refresh latency.
///
/// A document becomes searchable `refresh_interval` after it was indexed, or
/// immediately after [`SearchEngineClient::refresh`]. Queries match any
/// query term against the document's string fields, like a query-string
/// search with the default `OR` operator.
#[derive(Debug)]
pub struct MemorySearchEngine {
    documents: RwLock<HashMap<Uuid, StoredDocument>>,
    refresh_interval: Duration,
    index_exists: AtomicBool,
    indexed_count: AtomicUsize,
}

impl MemorySearchEngine {
    pub fn new() -> Self {
        Self::with_refresh_interval(DEFAULT_REFRESH_INTERVAL)
    }

    pub fn with_refresh_interval(refresh_interval: Duration) -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            refresh_interval,
            index_exists: AtomicBool::new(false),
            indexed_count: AtomicUsize::new(0),
        }
    }

    /// Number of accepted index requests, including overwrites.
    pub fn indexed_count(&self) -> usize {
        self.indexed_count.load(Ordering::SeqCst)
    }

    /// Number of distinct documents held, visible or not.
    pub async fn document_count(&self) -> usize {
        self.documents.read().await.len()
    }

    pub fn index_exists(&self) -> bool {
        self.index_exists.load(Ordering::SeqCst)
    }

    /// Fetch a document by id regardless of visibility.
    pub async fn get(&self, id: &Uuid) -> Option<IndexableDocument> {
        self.documents
            .read()
            .await
            .get(id)
            .map(|stored| stored.document.clone())
    }
}

impl Default for MemorySearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchEngineClient for MemorySearchEngine {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SearchError> {
        let terms = query.terms();
        if terms.is_empty() {
            return Err(SearchError::query("empty query"));
        }

        let now = Instant::now();
        let documents = self.documents.read().await;

        let mut hits: Vec<SearchHit> = documents
            .values()
            .filter(|stored| stored.visible_at <= now)
            .filter_map(|stored| {
                let matched = terms
                    .iter()
                    .filter(|term| stored.tokens.contains(term))
                    .count();
                (matched > 0).then(|| SearchHit {
                    id: stored.document.id,
                    score: matched as f64,
                    source: stored.source.clone(),
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        let total = hits.len() as u64;
        hits.truncate(query.limit);

        Ok(SearchResponse { total, hits })
    }

    async fn index_document(&self, document: &IndexableDocument) -> Result<(), SearchError> {
        // Like OpenSearch, indexing into a missing index creates it.
        self.index_exists.store(true, Ordering::SeqCst);

        let stored = StoredDocument {
            tokens: tokenize(&document.text()),
            source: document.to_source(),
            document: document.clone(),
            visible_at: Instant::now() + self.refresh_interval,
        };
        self.documents.write().await.insert(document.id, stored);
        self.indexed_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn ensure_index_exists(&self) -> Result<(), SearchError> {
        self.index_exists.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_index_if_exists(&self) -> Result<(), SearchError> {
        self.documents.write().await.clear();
        self.index_exists.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn refresh(&self) -> Result<(), SearchError> {
        let now = Instant::now();
        for stored in self.documents.write().await.values_mut() {
            if stored.visible_at > now {
                stored.visible_at = now;
            }
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        Ok(true)
    }
}
