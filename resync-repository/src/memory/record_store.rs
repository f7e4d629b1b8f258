//! In-memory record store.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::StoreError;
use crate::interfaces::{RecordCursor, RecordStore, SaveHook, SaveHooks};
use resync_shared::{Record, RecordFilter};

/// Record store keeping records in insertion order.
///
/// `insert` writes directly to the collection, bypassing hooks, the same way a
/// raw driver insert would. `save` goes through the hooked write path.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<Vec<Record>>,
    hooks: SaveHooks,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that runs `hooks` on every save.
    pub fn with_hooks(hooks: SaveHooks) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            hooks,
        }
    }

    /// Register an additional pre-save hook.
    pub fn register_hook(&mut self, hook: std::sync::Arc<dyn SaveHook>) {
        self.hooks.register(hook);
    }

    /// Insert a record without running hooks.
    pub async fn insert(&self, record: Record) {
        self.records.write().await.push(record);
    }

    /// Insert many records without running hooks.
    pub async fn insert_many(&self, records: impl IntoIterator<Item = Record>) {
        self.records.write().await.extend(records);
    }

    /// Remove every record.
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Fetch a record by id.
    pub async fn get(&self, id: &uuid::Uuid) -> Option<Record> {
        self.records
            .read()
            .await
            .iter()
            .find(|record| &record.id == id)
            .cloned()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    fn cursor<'a>(&'a self, filter: &'a RecordFilter) -> RecordCursor<'a> {
        // Position-based so that only one record is cloned per pull.
        stream::unfold(0usize, move |mut position| async move {
            let records = self.records.read().await;
            while position < records.len() {
                let record = &records[position];
                position += 1;
                if filter.matches(record) {
                    return Some((Ok(record.clone()), position));
                }
            }
            None
        })
        .boxed()
    }

    async fn save(&self, record: &Record) -> Result<(), StoreError> {
        self.hooks.run(record).await?;

        let mut records = self.records.write().await;
        match records.iter_mut().find(|existing| existing.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }

        debug!(record_id = %record.id, "Record saved");
        Ok(())
    }
}
