//! Writer module for the resync pipeline.
//!
//! Saves corrected records back to the primary store.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use resync_repository::{RecordStore, StoreError};
use resync_shared::Record;

/// Default time allowed for a single save.
pub const DEFAULT_SAVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Writer that persists records through the store's normal write path.
///
/// Every registered save hook runs on each persist. The writer only exists
/// for runs with saving enabled.
#[derive(Clone)]
pub struct PersistenceWriter {
    store: Arc<dyn RecordStore>,
    timeout: Duration,
}

impl PersistenceWriter {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_timeout(store, DEFAULT_SAVE_TIMEOUT)
    }

    pub fn with_timeout(store: Arc<dyn RecordStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Save a record, bounded by the writer's timeout.
    pub async fn persist(&self, record: &Record) -> Result<(), StoreError> {
        match tokio::time::timeout(self.timeout, self.store.save(record)).await {
            Ok(result) => {
                debug!(record_id = %record.id, ok = result.is_ok(), "Record persisted");
                result
            }
            Err(_) => Err(StoreError::timeout(format!(
                "save exceeded {:?}",
                self.timeout
            ))),
        }
    }
}
