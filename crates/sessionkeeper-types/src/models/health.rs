//! Health monitoring views and report shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Health status of an account or of the whole system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Transport reports a ready, authenticated session
    Healthy,
    /// Session exists but is not ready yet
    Warning,
    /// No session reachable
    Unhealthy,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Warning => write!(f, "warning"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Full health view of one registered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountHealthView {
    pub account_id: String,
    pub status: HealthStatus,
    pub consecutive_failures: u32,
    pub recovery_attempts: u32,
    pub total_checks: u64,
    pub successful_checks: u64,
    pub failed_checks: u64,
    /// Percentage of successful checks (0-100)
    pub uptime: f64,
    pub response_time_ms: u64,
    pub last_check: Option<DateTime<Utc>>,
    pub last_recovery: Option<DateTime<Utc>>,
    /// Automatic recovery is not possible; an operator must re-link
    pub needs_relink: bool,
    pub last_error: Option<String>,
}

/// Aggregated result of one health sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub timestamp: DateTime<Utc>,
    pub healthy: usize,
    pub warning: usize,
    pub unhealthy: usize,
    pub recovered: usize,
}

/// Process-wide monitoring metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub total_accounts: usize,
    pub total_checks: u64,
    pub total_recoveries: u64,
    pub total_failures: u64,
    /// Mean uptime percentage across registered accounts
    pub average_uptime: f64,
    /// recoveries / (recoveries + failures), as a percentage
    pub recovery_success_rate: f64,
    pub last_check_time: Option<DateTime<Utc>>,
}

/// Per-account entry of the health snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountHealthEntry {
    pub id: String,
    pub status: HealthStatus,
    pub uptime: f64,
    pub response_time: u64,
    pub consecutive_failures: u32,
    pub recovery_attempts: u32,
}

/// Metrics block of the health snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetrics {
    pub total_checks: u64,
    pub total_recoveries: u64,
    pub total_failures: u64,
    pub average_uptime: f64,
    pub recovery_success_rate: f64,
}

/// Health snapshot consumed by dashboards, HTTP endpoints and loggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub accounts: Vec<AccountHealthEntry>,
    pub metrics: SnapshotMetrics,
}

/// Dashboard assembly: snapshot, recent trend and accounts needing attention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthDashboard {
    pub snapshot: HealthSnapshot,
    pub trend: Vec<SweepSummary>,
    pub attention: Vec<AccountHealthView>,
    pub monitoring_active: bool,
}

/// Operator-facing suggestion derived from stored health state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub account_id: String,
    pub severity: HealthStatus,
    pub message: String,
}

/// Full health report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub generated_at: DateTime<Utc>,
    pub overall: HealthStatus,
    pub metrics: SystemMetrics,
    pub accounts: Vec<AccountHealthView>,
    pub history: Vec<SweepSummary>,
    pub recommendations: Vec<Recommendation>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = HealthSnapshot {
            status: HealthStatus::Warning,
            timestamp: Utc::now(),
            accounts: vec![AccountHealthEntry {
                id: "support".to_string(),
                status: HealthStatus::Warning,
                uptime: 50.0,
                response_time: 0,
                consecutive_failures: 1,
                recovery_attempts: 0,
            }],
            metrics: SnapshotMetrics {
                total_checks: 2,
                total_recoveries: 0,
                total_failures: 0,
                average_uptime: 50.0,
                recovery_success_rate: 0.0,
            },
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["status"], "warning");
        assert_eq!(json["accounts"][0]["responseTime"], 0);
        assert_eq!(json["accounts"][0]["consecutiveFailures"], 1);
        assert_eq!(json["metrics"]["recoverySuccessRate"], 0.0);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_status_ordering_by_severity() {
        assert!(HealthStatus::Healthy < HealthStatus::Warning);
        assert!(HealthStatus::Warning < HealthStatus::Unhealthy);
    }
}
