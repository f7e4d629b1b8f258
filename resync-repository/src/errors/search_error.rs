//! Search error types.
//!
//! This module defines the error types that can occur during search engine operations.

use thiserror::Error;

/// Errors that can occur during search engine operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    /// Failed to reach the search engine.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request did not complete in time.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The search engine answered with a non-success status.
    #[error("Rejected with status {status}: {reason}")]
    Rejected { status: u16, reason: String },

    /// Failed to index a single document.
    #[error("Index error: {0}")]
    IndexError(String),

    /// Search query execution failed.
    #[error("Query error: {0}")]
    QueryError(String),

    /// Failed to create or delete the search index.
    #[error("Index management error: {0}")]
    IndexManagementError(String),

    /// Failed to parse a response from the search engine.
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl SearchError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a rejection error.
    pub fn rejected(status: u16, reason: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            reason: reason.into(),
        }
    }

    /// Create an index error.
    pub fn index(msg: impl Into<String>) -> Self {
        Self::IndexError(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create an index management error.
    pub fn index_management(msg: impl Into<String>) -> Self {
        Self::IndexManagementError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Classify a transport-level failure as a timeout or a connection error.
    pub fn transport(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        let lower = msg.to_lowercase();
        if lower.contains("timed out") || lower.contains("timeout") {
            Self::Timeout(msg)
        } else {
            Self::ConnectionError(msg)
        }
    }
}
