//! Supervisor configuration models.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Per-account connection lifecycle tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct ConnectionConfig {
    /// First reconnect delay in milliseconds (default: 5000)
    #[validate(range(min = 1))]
    #[serde(default = "default_base_retry_delay_ms")]
    pub base_retry_delay_ms: u64,
    /// Upper bound for the reconnect delay in milliseconds (default: 60000)
    #[validate(range(min = 1))]
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
    /// Reconnect attempts before giving up (default: 10)
    #[validate(range(min = 1, max = 100))]
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Critical errors before the circuit breaker trips (default: 5)
    #[validate(range(min = 1))]
    #[serde(default = "default_circuit_breaker_threshold")]
    pub circuit_breaker_threshold: u32,
    /// Minimum spacing between accepted QR codes in milliseconds (default: 2000)
    #[serde(default = "default_qr_debounce_ms")]
    pub qr_debounce_ms: u64,
    /// QR abandonment window in seconds (default: 120)
    #[validate(range(min = 1))]
    #[serde(default = "default_qr_timeout_secs")]
    pub qr_timeout_secs: u64,
    /// Keep-alive touch interval in seconds (default: 30)
    #[validate(range(min = 1))]
    #[serde(default = "default_keep_alive_interval_secs")]
    pub keep_alive_interval_secs: u64,
    /// Connection health-check touch interval in seconds (default: 60)
    #[validate(range(min = 1))]
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
}

fn default_base_retry_delay_ms() -> u64 {
    5_000
}
fn default_max_retry_delay_ms() -> u64 {
    60_000
}
fn default_max_reconnect_attempts() -> u32 {
    10
}
fn default_circuit_breaker_threshold() -> u32 {
    5
}
fn default_qr_debounce_ms() -> u64 {
    2_000
}
fn default_qr_timeout_secs() -> u64 {
    120
}
fn default_keep_alive_interval_secs() -> u64 {
    30
}
fn default_health_check_interval_secs() -> u64 {
    60
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_retry_delay_ms: default_base_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            circuit_breaker_threshold: default_circuit_breaker_threshold(),
            qr_debounce_ms: default_qr_debounce_ms(),
            qr_timeout_secs: default_qr_timeout_secs(),
            keep_alive_interval_secs: default_keep_alive_interval_secs(),
            health_check_interval_secs: default_health_check_interval_secs(),
        }
    }
}

impl ConnectionConfig {
    pub const fn base_retry_delay(&self) -> Duration {
        Duration::from_millis(self.base_retry_delay_ms)
    }

    pub const fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(self.max_retry_delay_ms)
    }

    pub const fn qr_debounce(&self) -> Duration {
        Duration::from_millis(self.qr_debounce_ms)
    }

    pub const fn qr_timeout(&self) -> Duration {
        Duration::from_secs(self.qr_timeout_secs)
    }

    pub const fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.keep_alive_interval_secs)
    }

    pub const fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }
}

/// Process-wide health monitor tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct HealthConfig {
    /// Sweep period in seconds (default: 300 = 5 minutes)
    #[validate(range(min = 1))]
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    /// Consecutive failed probes before a recovery attempt (default: 3)
    #[validate(range(min = 1))]
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Wait for readiness after re-initialize, in seconds (default: 10)
    #[validate(range(min = 1))]
    #[serde(default = "default_recovery_timeout_secs")]
    pub recovery_timeout_secs: u64,
    /// Failed recoveries in a row before the account is left for manual re-link (default: 3)
    #[validate(range(min = 1))]
    #[serde(default = "default_max_recovery_attempts")]
    pub max_recovery_attempts: u32,
    /// Sweep summaries kept for trend reporting (default: 50)
    #[validate(range(min = 1, max = 10000))]
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_check_interval_secs() -> u64 {
    300
}
fn default_failure_threshold() -> u32 {
    3
}
fn default_recovery_timeout_secs() -> u64 {
    10
}
fn default_max_recovery_attempts() -> u32 {
    3
}
fn default_history_limit() -> usize {
    50
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout_secs(),
            max_recovery_attempts: default_max_recovery_attempts(),
            history_limit: default_history_limit(),
        }
    }
}

impl HealthConfig {
    pub const fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub const fn recovery_timeout(&self) -> Duration {
        Duration::from_secs(self.recovery_timeout_secs)
    }
}

/// Browser-automation sidecar endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct SidecarConfig {
    /// Sidecar HTTP base URL
    #[validate(url)]
    #[serde(default = "default_sidecar_url")]
    pub base_url: String,
    /// Request timeout in seconds (default: 30)
    #[validate(range(min = 1))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_sidecar_url() -> String {
    "http://127.0.0.1:9876".to_string()
}
fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self { base_url: default_sidecar_url(), request_timeout_secs: default_request_timeout_secs() }
    }
}

/// Account to supervise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct AccountSpec {
    #[validate(length(min = 1))]
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Browser profile directory handed to the transport
    #[serde(default)]
    pub session_path: Option<String>,
}

/// Root configuration for the supervisor daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, Validate)]
pub struct SupervisorConfig {
    #[validate(nested)]
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[validate(nested)]
    #[serde(default)]
    pub health: HealthConfig,
    #[validate(nested)]
    #[serde(default)]
    pub sidecar: SidecarConfig,
    #[validate(nested)]
    #[serde(default)]
    pub accounts: Vec<AccountSpec>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_lifecycle_constants() {
        let config = ConnectionConfig::default();
        assert_eq!(config.base_retry_delay(), Duration::from_secs(5));
        assert_eq!(config.max_retry_delay(), Duration::from_secs(60));
        assert_eq!(config.max_reconnect_attempts, 10);
        assert_eq!(config.circuit_breaker_threshold, 5);
        assert_eq!(config.qr_debounce(), Duration::from_secs(2));
        assert_eq!(config.qr_timeout(), Duration::from_secs(120));

        let health = HealthConfig::default();
        assert_eq!(health.check_interval(), Duration::from_secs(300));
        assert_eq!(health.failure_threshold, 3);
        assert_eq!(health.history_limit, 50);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SupervisorConfig =
            serde_json::from_str(r#"{"health": {"check_interval_secs": 60}}"#).unwrap();
        assert_eq!(config.health.check_interval_secs, 60);
        assert_eq!(config.health.failure_threshold, 3);
        assert_eq!(config.connection, ConnectionConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_threshold() {
        let mut config = SupervisorConfig::default();
        config.connection.circuit_breaker_threshold = 0;
        assert!(config.validate().is_err());
    }
}
