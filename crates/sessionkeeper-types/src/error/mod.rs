//! Typed error definitions for SessionKeeper.
//!
//! All errors are:
//!
//! - **Serializable** for API responses via serde
//! - **Displayable** for logging via Display trait
//! - **Matchable** for supervision logic via enum variants

mod config;
mod store;
mod transport;

pub use config::ConfigError;
pub use store::StoreError;
pub use transport::{ErrorClass, TransportError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type that wraps all domain-specific errors.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "domain", content = "error")]
pub enum TypedError {
    /// Wraps a transport/session error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Wraps an account store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Wraps a configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Standard Result type using TypedError.
pub type Result<T> = std::result::Result<T, TypedError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = TypedError::Store(StoreError::NotFound { id: "acc-7".to_string() });

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("Store"));
        assert!(json.contains("acc-7"));

        let deserialized: TypedError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, deserialized);
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::LockConflict {
            message: "The browser is already running for /data/session-1".to_string(),
        };

        let msg = format!("{}", TypedError::from(err));
        assert!(msg.contains("already running"));
        assert!(msg.starts_with("Transport error"));
    }
}
