//! # Resync Shared
//!
//! Types shared between the record store, the search engine adapters and the
//! resynchronization pipeline.

mod document;
mod filter;
mod record;
mod search;

pub use document::IndexableDocument;
pub use filter::RecordFilter;
pub use record::Record;
pub use search::{tokenize, SearchHit, SearchQuery, SearchResponse};
