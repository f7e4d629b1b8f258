//! Primary record store trait definition.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::errors::StoreError;
use resync_shared::{Record, RecordFilter};

/// A lazy, forward-only sequence of records.
///
/// Each item is pulled from the store when the stream is polled; a cursor
/// never holds the full result set. An `Err` item means the cursor itself
/// failed and no further records should be expected.
pub type RecordCursor<'a> = BoxStream<'a, Result<Record, StoreError>>;

/// Abstract interface over the primary data store.
///
/// Implementations must be `Send + Sync`; connection pooling is the store's
/// own responsibility.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Open a new cursor over the records matching `filter`.
    ///
    /// Records are produced in the store's natural, stable order. Every call
    /// opens an independent cursor; a cursor cannot be restarted.
    fn cursor<'a>(&'a self, filter: &'a RecordFilter) -> RecordCursor<'a>;

    /// Save a record through the store's normal write path.
    ///
    /// The write path runs every registered pre-save hook before the record
    /// is written. A record whose id is unknown to the store is inserted.
    async fn save(&self, record: &Record) -> Result<(), StoreError>;
}
