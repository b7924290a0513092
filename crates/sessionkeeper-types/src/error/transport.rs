//! Transport errors, tagged by failure class at the transport boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure class of a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Benign automation-layer race (closed target, protocol race, ...)
    Transient,
    /// Unclassified failure; counts toward the circuit breaker
    Critical,
    /// Browser profile/lock conflict; needs external cleanup
    LockConflict,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::Transient => write!(f, "transient"),
            ErrorClass::Critical => write!(f, "critical"),
            ErrorClass::LockConflict => write!(f, "lock_conflict"),
        }
    }
}

/// Errors surfaced by a session transport.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum TransportError {
    /// Benign race during teardown or navigation
    #[error("Transient transport error: {message}")]
    Transient {
        /// Raw message from the automation layer
        message: String,
    },

    /// Unclassified transport failure
    #[error("Transport failure: {message}")]
    Critical {
        /// Raw message from the automation layer
        message: String,
    },

    /// Another browser instance holds the session profile
    #[error("Browser profile conflict: {message}")]
    LockConflict {
        /// Raw message from the automation layer
        message: String,
    },
}

impl TransportError {
    pub fn critical(message: impl Into<String>) -> Self {
        Self::Critical { message: message.into() }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient { message: message.into() }
    }

    pub fn lock_conflict(message: impl Into<String>) -> Self {
        Self::LockConflict { message: message.into() }
    }

    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Transient { .. } => ErrorClass::Transient,
            Self::Critical { .. } => ErrorClass::Critical,
            Self::LockConflict { .. } => ErrorClass::LockConflict,
        }
    }

    /// Raw message without the class prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Transient { message }
            | Self::Critical { message }
            | Self::LockConflict { message } => message,
        }
    }

    /// Check if this error should count toward the circuit breaker.
    pub const fn counts_toward_breaker(&self) -> bool {
        !matches!(self, Self::Transient { .. })
    }

    /// Check if the remedy is external process/lock cleanup rather than a reconnect.
    pub const fn needs_external_cleanup(&self) -> bool {
        matches!(self, Self::LockConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaker_accounting() {
        assert!(!TransportError::transient("Target closed").counts_toward_breaker());
        assert!(TransportError::critical("net::ERR_FAILED").counts_toward_breaker());
        assert!(TransportError::lock_conflict("profile locked").counts_toward_breaker());
    }

    #[test]
    fn test_message_and_class() {
        let err = TransportError::lock_conflict("SingletonLock exists");
        assert_eq!(err.class(), ErrorClass::LockConflict);
        assert_eq!(err.message(), "SingletonLock exists");
        assert!(err.needs_external_cleanup());
    }
}
