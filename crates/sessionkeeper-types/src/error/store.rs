//! Account store errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while reading or writing persisted account records.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum StoreError {
    /// Account record with given ID not found
    #[error("Account record not found: {id}")]
    NotFound {
        /// Unique identifier of the missing account
        id: String,
    },

    /// Filesystem failure
    #[error("Account storage error: {message}")]
    Io {
        /// Description of the storage failure
        message: String,
    },

    /// Record could not be encoded or decoded
    #[error("Account record serialization error: {message}")]
    Serialization {
        /// Description of the encoding failure
        message: String,
    },
}
