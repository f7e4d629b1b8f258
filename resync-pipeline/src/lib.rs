//! # Resync Pipeline
//!
//! This crate provides the components for sweeping a primary record
//! collection and resynchronizing it into a search index.
//!
//! ## Architecture
//!
//! The pipeline follows the Source-Processor-Loader pattern:
//!
//! 1. **Source**: Pulls records lazily from the primary store
//! 2. **Processor**: Transforms records into search documents
//! 3. **Loader**: Submits documents to the search engine
//! 4. **Writer**: Optionally saves corrected records back to the store
//! 5. **Orchestrator**: Drives records through the stages and streams outcomes

pub mod errors;
pub mod loader;
pub mod orchestrator;
pub mod processor;
pub mod source;
pub mod writer;

pub use errors::{PipelineError, RecordError};
pub use orchestrator::{
    RecordFailure, SyncCanceller, SyncConfig, SyncEvent, SyncListeners, SyncState, SyncStream,
    SyncSummary, Synchronizer, Termination,
};
pub use processor::{FieldMapping, FieldType, IndexSchema, RecordTransformer, ValidationError};
