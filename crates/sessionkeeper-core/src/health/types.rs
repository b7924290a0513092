//! Per-account health records owned by the monitor.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sessionkeeper_types::{AccountHealthEntry, AccountHealthView, HealthStatus};

use crate::transport::Transport;

/// Result of one recovery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// Transport became ready within the recovery timeout
    Recovered,
    /// `initialize` returned an error
    Failed(String),
    /// No ready signal within the recovery timeout
    TimedOut,
    /// Never linked; only an operator can link it
    Ineligible,
    /// Too many failed recoveries in a row; waiting for re-link or a healthy probe
    Exhausted,
    UnknownAccount,
}

impl RecoveryOutcome {
    pub fn is_recovered(&self) -> bool {
        matches!(self, Self::Recovered)
    }
}

/// Mutable health counters for one account.
#[derive(Debug, Clone)]
pub(crate) struct AccountHealthRecord {
    pub status: HealthStatus,
    pub consecutive_failures: u32,
    pub recovery_attempts: u32,
    /// Failed recoveries since the last healthy probe
    pub failed_recoveries: u32,
    pub total_checks: u64,
    pub successful_checks: u64,
    pub failed_checks: u64,
    pub response_time: Duration,
    pub last_check: Option<DateTime<Utc>>,
    pub last_recovery: Option<DateTime<Utc>>,
    pub needs_relink: bool,
    pub last_error: Option<String>,
}

impl Default for AccountHealthRecord {
    fn default() -> Self {
        Self {
            status: HealthStatus::Healthy,
            consecutive_failures: 0,
            recovery_attempts: 0,
            failed_recoveries: 0,
            total_checks: 0,
            successful_checks: 0,
            failed_checks: 0,
            response_time: Duration::ZERO,
            last_check: None,
            last_recovery: None,
            needs_relink: false,
            last_error: None,
        }
    }
}

impl AccountHealthRecord {
    pub fn record_probe(&mut self, status: HealthStatus, elapsed: Duration, at: DateTime<Utc>) {
        self.status = status;
        self.total_checks += 1;
        self.response_time = elapsed;
        self.last_check = Some(at);

        match status {
            HealthStatus::Healthy => {
                self.successful_checks += 1;
                self.consecutive_failures = 0;
                self.failed_recoveries = 0;
                self.needs_relink = false;
                self.last_error = None;
            },
            HealthStatus::Warning | HealthStatus::Unhealthy => {
                self.failed_checks += 1;
                self.consecutive_failures += 1;
                self.last_error = Some(
                    if status == HealthStatus::Warning {
                        "session present but not ready"
                    } else {
                        "no session reachable"
                    }
                    .to_string(),
                );
            },
        }
    }

    /// Successful checks as a percentage. 100 before the first check.
    pub fn uptime(&self) -> f64 {
        if self.total_checks == 0 {
            return 100.0;
        }
        self.successful_checks as f64 / self.total_checks as f64 * 100.0
    }

    pub fn view(&self, account_id: &str) -> AccountHealthView {
        AccountHealthView {
            account_id: account_id.to_string(),
            status: self.status,
            consecutive_failures: self.consecutive_failures,
            recovery_attempts: self.recovery_attempts,
            total_checks: self.total_checks,
            successful_checks: self.successful_checks,
            failed_checks: self.failed_checks,
            uptime: self.uptime(),
            response_time_ms: self.response_time.as_millis() as u64,
            last_check: self.last_check,
            last_recovery: self.last_recovery,
            needs_relink: self.needs_relink,
            last_error: self.last_error.clone(),
        }
    }

    pub fn entry(&self, account_id: &str) -> AccountHealthEntry {
        AccountHealthEntry {
            id: account_id.to_string(),
            status: self.status,
            uptime: self.uptime(),
            response_time: self.response_time.as_millis() as u64,
            consecutive_failures: self.consecutive_failures,
            recovery_attempts: self.recovery_attempts,
        }
    }
}

/// Registry entry: the transport handle plus its health record.
pub(crate) struct MonitoredAccount {
    /// Registration order; sweeps visit accounts by ascending `seq`
    pub seq: u64,
    pub account_id: String,
    pub transport: Arc<dyn Transport>,
    pub record: Mutex<AccountHealthRecord>,
}

impl MonitoredAccount {
    pub fn new(seq: u64, account_id: String, transport: Arc<dyn Transport>) -> Self {
        Self { seq, account_id, transport, record: Mutex::new(AccountHealthRecord::default()) }
    }
}
