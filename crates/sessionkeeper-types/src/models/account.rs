//! Persisted account record.

use super::ConnectionState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Last lifecycle state written to the account store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LastKnownState {
    #[default]
    Idle,
    Connecting,
    QrPending,
    Connected,
    Disconnected,
    Error,
    Suspended,
    /// Operator requested a fresh device link
    Relinking,
}

impl From<ConnectionState> for LastKnownState {
    fn from(state: ConnectionState) -> Self {
        match state {
            ConnectionState::Idle => Self::Idle,
            ConnectionState::Connecting => Self::Connecting,
            ConnectionState::Connected => Self::Connected,
            ConnectionState::Disconnected => Self::Disconnected,
            ConnectionState::Error => Self::Error,
            ConnectionState::Suspended => Self::Suspended,
        }
    }
}

impl fmt::Display for LastKnownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::QrPending => "qr_pending",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
            Self::Suspended => "suspended",
            Self::Relinking => "relinking",
        };
        write!(f, "{s}")
    }
}

/// Account record as persisted by the state store.
///
/// Holds lifecycle flags only. Session credentials and cookies belong to the
/// transport and are never written here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    /// Stable account key
    pub id: String,
    /// Human-readable name for dashboards
    pub display_name: String,
    /// Whether this account has ever completed a device link
    #[serde(default)]
    pub device_linked: bool,
    /// Whether the session is currently live
    #[serde(default)]
    pub is_active: bool,
    /// Transport session/profile directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_path: Option<String>,
    #[serde(default)]
    pub last_known_state: LastKnownState,
    /// Whether a QR scan is needed before the session can be used
    #[serde(default = "default_requires_qr")]
    pub requires_qr_code: bool,
}

fn default_requires_qr() -> bool {
    true
}

impl AccountRecord {
    /// Create a record for an account that has never been linked.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            device_linked: false,
            is_active: false,
            session_path: None,
            last_known_state: LastKnownState::Idle,
            requires_qr_code: true,
        }
    }

    /// Apply a connection state transition to the lifecycle flags.
    pub fn apply_state(&mut self, state: ConnectionState) {
        self.last_known_state = state.into();
        self.is_active = state == ConnectionState::Connected;
        if state == ConnectionState::Connected {
            self.device_linked = true;
            self.requires_qr_code = false;
        }
    }

    /// Mark the record for a fresh device link.
    pub fn mark_relinking(&mut self) {
        self.is_active = false;
        self.requires_qr_code = true;
        self.last_known_state = LastKnownState::Relinking;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serializes_camel_case() {
        let mut record = AccountRecord::new("sales-1", "Sales line");
        record.mark_relinking();

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["displayName"], "Sales line");
        assert_eq!(json["isActive"], false);
        assert_eq!(json["requiresQrCode"], true);
        assert_eq!(json["lastKnownState"], "relinking");
    }

    #[test]
    fn test_connected_marks_linked() {
        let mut record = AccountRecord::new("a", "A");
        record.apply_state(ConnectionState::Connected);
        assert!(record.device_linked);
        assert!(record.is_active);
        assert!(!record.requires_qr_code);

        record.apply_state(ConnectionState::Disconnected);
        assert!(record.device_linked);
        assert!(!record.is_active);
        assert_eq!(record.last_known_state, LastKnownState::Disconnected);
    }
}
