//! Dependency initialization and wiring for the resync binary.

use std::sync::Arc;
use tracing::info;

use crate::{ResyncConfig, ResyncError};
use resync_pipeline::{RecordTransformer, Synchronizer};
use resync_repository::opensearch::IndexConfig;
use resync_repository::{OpenSearchClient, PgRecordStore, SaveHooks, SearchEngineClient};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured synchronizer ready to run.
    pub synchronizer: Synchronizer,
}

impl Dependencies {
    /// Connect to OpenSearch and Postgres and build the synchronizer.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(ResyncError)` - If a backend is unreachable or cannot be prepared
    pub async fn new(config: &ResyncConfig) -> Result<Self, ResyncError> {
        info!(
            opensearch_url = %config.opensearch_url,
            index = %config.index_name,
            table = %config.table,
            "Initializing dependencies"
        );

        let schema = config.schema();

        // Initialize OpenSearch client
        let index_config = IndexConfig::new(config.index_name.clone(), schema.text_fields());
        let search_client = OpenSearchClient::new(&config.opensearch_url, index_config)
            .await
            .map_err(|e| ResyncError::config(format!("Failed to create OpenSearch client: {}", e)))?;

        // Verify OpenSearch is reachable
        let healthy = search_client
            .health_check()
            .await
            .map_err(|e| ResyncError::config(format!("OpenSearch health check failed: {}", e)))?;

        if !healthy {
            return Err(ResyncError::config("OpenSearch cluster is unhealthy"));
        }

        search_client.ensure_index_exists().await?;
        info!("OpenSearch connection verified");

        // Initialize the record store
        let store = PgRecordStore::new(
            &config.database_url,
            &config.table,
            config.max_connections(),
            SaveHooks::new(),
        )
        .await?;
        store.ensure_table().await?;

        info!("Record store connected");

        let synchronizer = Synchronizer::new(
            Arc::new(store),
            Arc::new(search_client),
            RecordTransformer::new(schema),
        );

        Ok(Self { synchronizer })
    }
}
