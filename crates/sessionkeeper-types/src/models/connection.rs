//! Connection state machine types and status snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of one account's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not started, or torn down
    #[default]
    Idle,
    /// Transport initialization in progress
    Connecting,
    /// Authenticated and usable
    Connected,
    /// Session dropped; eligible for reconnect
    Disconnected,
    /// Last operation failed
    Error,
    /// Circuit breaker cooldown; no reconnects
    Suspended,
}

impl ConnectionState {
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "idle"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Error => write!(f, "error"),
            ConnectionState::Suspended => write!(f, "suspended"),
        }
    }
}

/// One recorded state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: ConnectionState,
    pub to: ConnectionState,
    pub at: DateTime<Utc>,
}

/// Cumulative per-account connection metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionMetricsView {
    pub total_connections: u64,
    pub total_disconnections: u64,
    pub total_reconnects: u64,
    pub total_errors: u64,
    pub total_recoveries: u64,
    pub last_error_message: Option<String>,
    pub last_error_time: Option<DateTime<Utc>>,
    pub last_connected_at: Option<DateTime<Utc>>,
    pub last_disconnected_at: Option<DateTime<Utc>>,
    /// Running average over the retained session durations
    pub average_session_duration_ms: u64,
    pub recorded_sessions: usize,
    pub qr_codes_generated: u64,
    pub circuit_breaker_trips: u32,
}

/// Compact status for dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub account_id: String,
    pub state: ConnectionState,
    pub is_connected: bool,
    /// Time since the current session was established
    pub uptime_ms: Option<u64>,
    pub reconnect_attempts: u32,
    pub error_count: u32,
    pub circuit_breaker_trips: u32,
    pub browser_pid: Option<u32>,
}

/// Full status including metrics and recent transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedConnectionStatus {
    #[serde(flatten)]
    pub status: ConnectionStatus,
    pub metrics: ConnectionMetricsView,
    /// Last five transitions, oldest first
    pub recent_transitions: Vec<StateTransition>,
    pub qr_attempts: u32,
    pub is_initializing: bool,
    pub connection_failure_reason: Option<String>,
    pub session_created_at: Option<DateTime<Utc>>,
    pub last_activity_at: Option<DateTime<Utc>>,
    /// Remaining circuit breaker cooldown while suspended
    pub cooldown_remaining_ms: Option<u64>,
    /// Reconnects exhausted; an operator must re-link
    pub requires_relink: bool,
}
