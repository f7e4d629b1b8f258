//! Record store error types.

use thiserror::Error;

/// Errors that can occur while reading from or writing to the primary store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Failed to connect to the store.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The cursor failed while pulling the next record.
    #[error("Cursor error: {0}")]
    CursorError(String),

    /// A write was rejected by the store.
    #[error("Write error: {0}")]
    WriteError(String),

    /// A pre-save hook refused the write.
    #[error("Hook {hook} failed: {reason}")]
    HookError { hook: String, reason: String },

    /// The store configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The write did not complete in time.
    #[error("Timeout: {0}")]
    Timeout(String),
}

impl StoreError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a cursor error.
    pub fn cursor(msg: impl Into<String>) -> Self {
        Self::CursorError(msg.into())
    }

    /// Create a write error.
    pub fn write(msg: impl Into<String>) -> Self {
        Self::WriteError(msg.into())
    }

    /// Create a hook error.
    pub fn hook(hook: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::HookError {
            hook: hook.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }
}
