//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchEngineClient`
//! using the OpenSearch Rust client.

use std::time::Duration;

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::{
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
    indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesRefreshParts},
    IndexParts, OpenSearch, SearchParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::errors::SearchError;
use crate::interfaces::SearchEngineClient;
use crate::opensearch::index_config::IndexConfig;
use crate::opensearch::queries::{build_search_query, error_reason, parse_search_response};
use resync_shared::{IndexableDocument, SearchQuery, SearchResponse};

/// Default timeout applied to every request made by the transport.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// OpenSearch client implementation.
///
/// # Example
///
/// ```ignore
/// use resync_repository::opensearch::IndexConfig;
/// let config = IndexConfig::new("books", vec!["title".to_string()]);
/// let client = OpenSearchClient::new("http://localhost:9200", config).await?;
/// client.ensure_index_exists().await?;
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
    index_config: IndexConfig,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `index_config` - The target index and its indexed fields
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchError)` - If connection setup fails
    pub async fn new(url: &str, index_config: IndexConfig) -> Result<Self, SearchError> {
        Self::with_timeout(url, index_config, DEFAULT_REQUEST_TIMEOUT).await
    }

    /// Create a client whose requests fail after `timeout`.
    pub async fn with_timeout(
        url: &str,
        index_config: IndexConfig,
        timeout: Duration,
    ) -> Result<Self, SearchError> {
        let parsed_url = Url::parse(url).map_err(|e| SearchError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            index = %index_config.name,
            "Created OpenSearch client"
        );

        Ok(Self {
            client,
            index_config,
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index_config.name
    }

    /// Turn a non-success response into a `Rejected` error.
    async fn rejection(response: Response) -> SearchError {
        let status = response.status_code().as_u16();
        let body = response.text().await.unwrap_or_default();
        SearchError::rejected(status, error_reason(&body))
    }
}

#[async_trait]
impl SearchEngineClient for OpenSearchClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SearchError> {
        let response = self
            .client
            .search(SearchParts::Index(&[self.index_config.name.as_str()]))
            .body(build_search_query(query))
            .send()
            .await
            .map_err(|e| SearchError::transport(e.to_string()))?;

        if !response.status_code().is_success() {
            let err = Self::rejection(response).await;
            error!(error = %err, "Search request failed");
            return Err(SearchError::query(err.to_string()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        parse_search_response(&body)
    }

    async fn index_document(&self, document: &IndexableDocument) -> Result<(), SearchError> {
        let doc_id = document.id.to_string();

        let response = self
            .client
            .index(IndexParts::IndexId(&self.index_config.name, &doc_id))
            .body(document.to_source())
            .send()
            .await
            .map_err(|e| SearchError::transport(e.to_string()))?;

        if !response.status_code().is_success() {
            let err = Self::rejection(response).await;
            debug!(doc_id = %doc_id, error = %err, "Index request rejected");
            return Err(err);
        }

        debug!(doc_id = %doc_id, "Document indexed");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn ensure_index_exists(&self) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[self.index_config.name.as_str()]))
            .send()
            .await
            .map_err(|e| SearchError::transport(e.to_string()))?;

        if response.status_code().is_success() {
            debug!("Search index already exists");
            return Ok(());
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&self.index_config.name))
            .body(self.index_config.settings())
            .send()
            .await
            .map_err(|e| SearchError::transport(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Another process may have created the index in between.
            if body.contains("resource_already_exists_exception") {
                return Ok(());
            }
            error!(status = %status, body = %body, "Index creation failed");
            return Err(SearchError::index_management(format!(
                "Index creation failed with status {}: {}",
                status,
                error_reason(&body)
            )));
        }

        info!("Created search index");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_index_if_exists(&self) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[self.index_config.name.as_str()]))
            .send()
            .await
            .map_err(|e| SearchError::transport(e.to_string()))?;

        let status = response.status_code();

        // 404 is acceptable - the index may not exist
        if !status.is_success() && status.as_u16() != 404 {
            let err = Self::rejection(response).await;
            return Err(SearchError::index_management(err.to_string()));
        }

        info!("Deleted search index");
        Ok(())
    }

    async fn refresh(&self) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .refresh(IndicesRefreshParts::Index(&[self.index_config.name.as_str()]))
            .send()
            .await
            .map_err(|e| SearchError::transport(e.to_string()))?;

        if !response.status_code().is_success() {
            return Err(Self::rejection(response).await);
        }

        debug!(index = %self.index_config.name, "Search index refreshed");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| SearchError::transport(e.to_string()))?;

        let health: Value = response.json().await.unwrap_or(json!({}));
        let status = health
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("unknown");

        debug!(status = %status, "OpenSearch cluster status");
        Ok(status == "green" || status == "yellow")
    }
}
