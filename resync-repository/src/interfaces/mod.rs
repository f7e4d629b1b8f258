//! Interface definitions for the pipeline's collaborators.
//!
//! The pipeline only talks to these traits, which allows for dependency
//! injection and swappable backends.

mod record_store;
mod save_hook;
mod search_engine_client;

pub use record_store::{RecordCursor, RecordStore};
pub use save_hook::{SaveCounter, SaveHook, SaveHooks};
pub use search_engine_client::SearchEngineClient;
