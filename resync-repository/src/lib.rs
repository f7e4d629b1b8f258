//! # Resync Repository
//!
//! Traits and implementations for the two collaborators of the resync
//! pipeline: the primary record store and the search engine. Concrete
//! implementations are provided for OpenSearch, Postgres, and in-memory
//! backends used by tests and local runs.

pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod opensearch;
pub mod postgres;

pub use errors::{SearchError, StoreError};
pub use interfaces::{RecordCursor, RecordStore, SaveCounter, SaveHook, SaveHooks, SearchEngineClient};
pub use memory::{MemoryRecordStore, MemorySearchEngine};
pub use opensearch::OpenSearchClient;
pub use postgres::PgRecordStore;
