//! Unified error types for SessionKeeper Core.

use serde::Serialize;
use sessionkeeper_types::{ConfigError, StoreError, TransportError};
use thiserror::Error;

/// Main error type for all core operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    /// Session transport failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Persisted account record could not be read or written.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// HTTP request to the sidecar failed.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Browser process or profile lock cleanup failed.
    #[error("Process error: {0}")]
    Process(String),

    /// Account is unknown or in the wrong state for the operation.
    #[error("Account error: {0}")]
    Account(String),
}

impl Serialize for CoreError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
