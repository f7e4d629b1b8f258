//! # Resync
//!
//! Main library for the resync binary.
//!
//! This crate provides the configuration and dependency wiring for running
//! one full resynchronization sweep.

pub mod config;

pub use config::{Dependencies, ResyncConfig};

use thiserror::Error;

/// Errors that can occur during startup or while running a sweep.
#[derive(Error, Debug)]
pub enum ResyncError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] resync_pipeline::PipelineError),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] resync_repository::SearchError),

    /// Record store error.
    #[error("Store error: {0}")]
    StoreError(#[from] resync_repository::StoreError),
}

impl ResyncError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
