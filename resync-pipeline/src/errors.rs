//! Error types for the resync pipeline.

use resync_repository::{SearchError, StoreError};
use thiserror::Error;

use crate::processor::ValidationError;

/// Errors that end a whole synchronization run or prevent it from starting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Invalid pipeline configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The record cursor failed before the collection was exhausted.
    #[error("Source error: {0}")]
    SourceError(String),

    /// The run ended without reporting a summary.
    #[error("Synchronization ended without a summary")]
    Aborted,
}

impl PipelineError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

/// Why a single record could not be synchronized.
///
/// Never escapes the stream as an `Err`; it travels inside a failure event.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    /// The record does not satisfy the index schema.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The search engine did not accept the document.
    #[error("Indexing failed after {attempts} attempt(s): {source}")]
    Index { source: SearchError, attempts: u32 },

    /// Writing the record back to the store failed.
    #[error("Persistence failed (indexed: {indexed}): {source}")]
    Persistence { source: StoreError, indexed: bool },

    /// The worker processing the record stopped unexpectedly.
    #[error("Worker failed: {0}")]
    Worker(String),
}

impl RecordError {
    /// Whether the document reached the search index despite the failure.
    pub fn is_indexed(&self) -> bool {
        matches!(self, Self::Persistence { indexed: true, .. })
    }
}
