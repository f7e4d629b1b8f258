//! Source module for the resync pipeline.
//!
//! Opens cursors over the primary store.

use std::time::Duration;

use futures::StreamExt;
use tracing::{debug, warn};

use resync_repository::{RecordCursor, RecordStore, StoreError};
use resync_shared::{Record, RecordFilter};

/// Default time allowed for the cursor to yield its next record.
pub const DEFAULT_PULL_TIMEOUT: Duration = Duration::from_secs(30);

/// Entry point for reading the records a run synchronizes.
pub struct RecordSource;

impl RecordSource {
    /// Open a fresh cursor over the records matching `filter`.
    ///
    /// The cursor is lazy and single-pass; records are fetched only as it
    /// is polled.
    pub fn open<'a>(store: &'a dyn RecordStore, filter: &'a RecordFilter) -> RecordCursor<'a> {
        debug!(filter = %filter.as_json(), "Opening record cursor");
        store.cursor(filter)
    }

    /// Pull the next record, failing the cursor if it stalls past `timeout`.
    ///
    /// Returns `None` once the cursor is exhausted.
    pub async fn pull(
        cursor: &mut RecordCursor<'_>,
        timeout: Duration,
    ) -> Option<Result<Record, StoreError>> {
        match tokio::time::timeout(timeout, cursor.next()).await {
            Ok(next) => next,
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Record cursor stalled");
                Some(Err(StoreError::timeout(format!(
                    "cursor pull timed out after {:?}",
                    timeout
                ))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use resync_repository::MemoryRecordStore;

    #[tokio::test]
    async fn test_open_yields_matching_records_in_order() {
        let store = MemoryRecordStore::new();
        let first = Record::empty().with_field("genre", "novel");
        let second = Record::empty().with_field("genre", "poetry");
        let third = Record::empty().with_field("genre", "novel");
        store
            .insert_many(vec![first.clone(), second, third.clone()])
            .await;

        let filter = RecordFilter::all().with_field("genre", "novel");
        let ids: Vec<_> = RecordSource::open(&store, &filter)
            .map(|record| record.unwrap().id)
            .collect()
            .await;

        assert_eq!(ids, vec![first.id, third.id]);
    }

    #[tokio::test]
    async fn test_every_open_is_a_new_cursor() {
        let store = MemoryRecordStore::new();
        store.insert(Record::empty()).await;
        let filter = RecordFilter::all();

        let first = RecordSource::open(&store, &filter).count().await;
        let second = RecordSource::open(&store, &filter).count().await;

        assert_eq!((first, second), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pull_times_out_on_stalled_cursor() {
        let record = Record::empty();
        let first = record.clone();
        let mut cursor: RecordCursor<'_> = stream::once(async move { Ok(first) })
            .chain(stream::pending())
            .boxed();
        let timeout = Duration::from_secs(5);

        let pulled = RecordSource::pull(&mut cursor, timeout).await;
        assert_eq!(pulled.map(|r| r.map(|r| r.id)), Some(Ok(record.id)));

        let stalled = RecordSource::pull(&mut cursor, timeout).await;
        assert!(matches!(
            stalled,
            Some(Err(StoreError::Timeout(message))) if message.contains("timed out")
        ));
    }

    #[tokio::test]
    async fn test_pull_returns_none_when_exhausted() {
        let store = MemoryRecordStore::new();
        let filter = RecordFilter::all();
        let mut cursor = RecordSource::open(&store, &filter);

        assert!(RecordSource::pull(&mut cursor, DEFAULT_PULL_TIMEOUT).await.is_none());
    }
}
