//! Configuration errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum ConfigError {
    /// Configuration file could not be read or written
    #[error("Failed to access config file {path}: {message}")]
    Io {
        /// Path of the config file
        path: String,
        /// Underlying I/O failure
        message: String,
    },

    /// Configuration file is not valid JSON for the expected shape
    #[error("Failed to parse config: {message}")]
    Parse {
        /// Parser message
        message: String,
    },

    /// A value is outside its allowed range
    #[error("Invalid config value: {message}")]
    Invalid {
        /// Validation report
        message: String,
    },

    /// Data directory could not be resolved
    #[error("Cannot resolve data directory: {message}")]
    DataDir {
        /// Reason the directory is unavailable
        message: String,
    },
}
