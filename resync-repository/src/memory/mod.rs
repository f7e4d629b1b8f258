//! In-memory implementations of the record store and the search engine.
//!
//! Used by tests and local dry runs. Both are safe for concurrent use.

mod record_store;
mod search_engine;

pub use record_store::MemoryRecordStore;
pub use search_engine::MemorySearchEngine;
