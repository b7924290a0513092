//! Health Monitor implementation.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use sessionkeeper_types::{
    AccountHealthView, HealthConfig, HealthDashboard, HealthReport, HealthSnapshot, HealthStatus,
    SnapshotMetrics, SweepSummary, SystemMetrics, TransportError,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::report::recommendations;
use super::types::{MonitoredAccount, RecoveryOutcome};
use crate::store::AccountStore;
use crate::transport::{Transport, TransportEvent};

/// Sweeps shown on the dashboard.
const DASHBOARD_TREND: usize = 10;

/// Process-wide health monitor for every registered account.
pub struct HealthMonitor {
    /// Per-account health tracking
    accounts: DashMap<String, Arc<MonitoredAccount>>,
    config: HealthConfig,
    /// Source of the "previously linked" flag
    store: Arc<dyn AccountStore>,
    total_checks: AtomicU64,
    total_recoveries: AtomicU64,
    total_failures: AtomicU64,
    next_seq: AtomicU64,
    last_check_time: RwLock<Option<DateTime<Utc>>>,
    history: Mutex<VecDeque<SweepSummary>>,
    sweep_task: Mutex<Option<JoinHandle<()>>>,
    /// Serializes overlapping sweeps
    sweep_lock: tokio::sync::Mutex<()>,
}

impl HealthMonitor {
    /// Create a new health monitor with default configuration
    pub fn new(store: Arc<dyn AccountStore>) -> Arc<Self> {
        Self::with_config(HealthConfig::default(), store)
    }

    /// Create a new health monitor with custom config
    pub fn with_config(config: HealthConfig, store: Arc<dyn AccountStore>) -> Arc<Self> {
        Arc::new(Self {
            accounts: DashMap::new(),
            config,
            store,
            total_checks: AtomicU64::new(0),
            total_recoveries: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            next_seq: AtomicU64::new(0),
            last_check_time: RwLock::new(None),
            history: Mutex::new(VecDeque::new()),
            sweep_task: Mutex::new(None),
            sweep_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Register an account. Rejects an empty id or a missing transport;
    /// a duplicate id is accepted and leaves the existing record alone.
    pub fn register_account(&self, account_id: &str, transport: Option<Arc<dyn Transport>>) -> bool {
        let Some(transport) = transport else {
            warn!(account_id, "refusing to register account without a transport");
            return false;
        };
        if account_id.is_empty() {
            warn!("refusing to register account with an empty id");
            return false;
        }

        self.accounts.entry(account_id.to_string()).or_insert_with(|| {
            let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
            Arc::new(MonitoredAccount::new(seq, account_id.to_string(), transport))
        });
        true
    }

    /// Remove an account from health monitoring
    pub fn unregister_account(&self, account_id: &str) -> bool {
        self.accounts.remove(account_id).is_some()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Accounts in registration order.
    fn accounts_by_registration(&self) -> Vec<Arc<MonitoredAccount>> {
        let mut accounts: Vec<_> = self.accounts.iter().map(|e| Arc::clone(e.value())).collect();
        accounts.sort_by_key(|a| a.seq);
        accounts
    }

    /// Accounts sorted by id, for reports.
    fn accounts_by_id(&self) -> Vec<Arc<MonitoredAccount>> {
        let mut accounts: Vec<_> = self.accounts.iter().map(|e| Arc::clone(e.value())).collect();
        accounts.sort_by(|a, b| a.account_id.cmp(&b.account_id));
        accounts
    }

    /// Run one sweep now, then every `check_interval`. Idempotent.
    pub fn start_health_checks(self: &Arc<Self>) -> bool {
        let mut task = self.sweep_task.lock();
        if task.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        let period = self.config.check_interval();
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let Some(monitor) = weak.upgrade() else {
                    break;
                };
                monitor.perform_health_checks().await;
            }
        }));

        info!(interval_secs = period.as_secs(), "health checks started");
        true
    }

    /// Stop the periodic sweep. No-op when not running.
    pub fn stop_health_checks(&self) -> bool {
        match self.sweep_task.lock().take() {
            Some(handle) => {
                handle.abort();
                info!("health checks stopped");
                true
            },
            None => false,
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.sweep_task.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Probe every account, then run due recoveries concurrently.
    pub async fn perform_health_checks(&self) -> SweepSummary {
        let _sweep = self.sweep_lock.lock().await;
        let accounts = self.accounts_by_registration();
        let threshold = self.config.failure_threshold;

        let (mut healthy, mut warning, mut unhealthy) = (0, 0, 0);
        let mut due = Vec::new();

        for account in &accounts {
            let status = self.probe(account);
            match status {
                HealthStatus::Healthy => healthy += 1,
                HealthStatus::Warning => warning += 1,
                HealthStatus::Unhealthy => unhealthy += 1,
            }

            let failures = account.record.lock().consecutive_failures;
            if status != HealthStatus::Healthy && failures >= threshold {
                due.push(account.account_id.as_str());
            }
        }

        let outcomes = join_all(due.iter().map(|id| self.attempt_account_recovery(id))).await;
        let recovered = outcomes.iter().filter(|o| o.is_recovered()).count();

        let now = Utc::now();
        let summary = SweepSummary { timestamp: now, healthy, warning, unhealthy, recovered };
        {
            let limit = self.config.history_limit.max(1);
            let mut history = self.history.lock();
            while history.len() >= limit {
                history.pop_front();
            }
            history.push_back(summary);
        }
        *self.last_check_time.write() = Some(now);

        info!(healthy, warning, unhealthy, recovered, "health sweep complete");
        summary
    }

    fn probe(&self, account: &MonitoredAccount) -> HealthStatus {
        let started = Instant::now();
        let status = if account.transport.is_ready() {
            HealthStatus::Healthy
        } else if account.transport.has_session() {
            HealthStatus::Warning
        } else {
            HealthStatus::Unhealthy
        };
        let elapsed = started.elapsed();

        account.record.lock().record_probe(status, elapsed, Utc::now());
        self.total_checks.fetch_add(1, Ordering::Relaxed);
        debug!(account_id = %account.account_id, %status, "probe");
        status
    }

    /// Re-initialize a previously linked account and wait for readiness.
    pub async fn attempt_account_recovery(&self, account_id: &str) -> RecoveryOutcome {
        let Some(account) = self.accounts.get(account_id).map(|e| Arc::clone(e.value())) else {
            return RecoveryOutcome::UnknownAccount;
        };

        if !self.store.was_previously_linked(account_id) {
            account.record.lock().needs_relink = true;
            info!(account_id, "recovery skipped: account was never linked");
            return RecoveryOutcome::Ineligible;
        }

        {
            let mut record = account.record.lock();
            if record.failed_recoveries >= self.config.max_recovery_attempts {
                record.needs_relink = true;
                debug!(account_id, failed = record.failed_recoveries, "recovery exhausted");
                return RecoveryOutcome::Exhausted;
            }
            record.recovery_attempts += 1;
            record.last_recovery = Some(Utc::now());
        }

        info!(account_id, "attempting account recovery");
        let transport = Arc::clone(&account.transport);
        let outcome =
            match tokio::time::timeout(self.config.recovery_timeout(), reinitialize(transport)).await {
                Ok(Ok(())) => RecoveryOutcome::Recovered,
                Ok(Err(e)) => RecoveryOutcome::Failed(e.to_string()),
                Err(_) => RecoveryOutcome::TimedOut,
            };

        let mut record = account.record.lock();
        match &outcome {
            RecoveryOutcome::Recovered => {
                record.consecutive_failures = 0;
                record.failed_recoveries = 0;
                record.needs_relink = false;
                self.total_recoveries.fetch_add(1, Ordering::Relaxed);
                info!(account_id, "account recovered");
            },
            failed => {
                record.failed_recoveries += 1;
                if record.failed_recoveries >= self.config.max_recovery_attempts {
                    record.needs_relink = true;
                }
                record.last_error = Some(format!("recovery failed: {failed:?}"));
                self.total_failures.fetch_add(1, Ordering::Relaxed);
                warn!(account_id, outcome = ?failed, "account recovery failed");
            },
        }
        outcome
    }

    pub fn account_health(&self, account_id: &str) -> Option<AccountHealthView> {
        let account = self.accounts.get(account_id)?;
        let view = account.record.lock().view(account_id);
        Some(view)
    }

    pub fn all_accounts_health(&self) -> Vec<AccountHealthView> {
        self.accounts_by_id()
            .iter()
            .map(|a| a.record.lock().view(&a.account_id))
            .collect()
    }

    pub fn system_metrics(&self) -> SystemMetrics {
        let accounts = self.all_accounts_health();
        let average_uptime = if accounts.is_empty() {
            0.0
        } else {
            accounts.iter().map(|a| a.uptime).sum::<f64>() / accounts.len() as f64
        };

        let recoveries = self.total_recoveries.load(Ordering::Relaxed);
        let failures = self.total_failures.load(Ordering::Relaxed);
        let attempts = recoveries + failures;
        let recovery_success_rate =
            if attempts == 0 { 0.0 } else { recoveries as f64 / attempts as f64 * 100.0 };

        SystemMetrics {
            total_accounts: accounts.len(),
            total_checks: self.total_checks.load(Ordering::Relaxed),
            total_recoveries: recoveries,
            total_failures: failures,
            average_uptime,
            recovery_success_rate,
            last_check_time: *self.last_check_time.read(),
        }
    }

    /// Last `last_n` sweep summaries, oldest first.
    pub fn health_trend(&self, last_n: usize) -> Vec<SweepSummary> {
        let history = self.history.lock();
        let skip = history.len().saturating_sub(last_n);
        history.iter().skip(skip).copied().collect()
    }

    pub fn health_snapshot(&self) -> HealthSnapshot {
        let entries: Vec<_> = self
            .accounts_by_id()
            .iter()
            .map(|a| a.record.lock().entry(&a.account_id))
            .collect();
        let status = entries.iter().map(|e| e.status).max().unwrap_or(HealthStatus::Healthy);
        let metrics = self.system_metrics();

        HealthSnapshot {
            status,
            timestamp: Utc::now(),
            accounts: entries,
            metrics: SnapshotMetrics {
                total_checks: metrics.total_checks,
                total_recoveries: metrics.total_recoveries,
                total_failures: metrics.total_failures,
                average_uptime: metrics.average_uptime,
                recovery_success_rate: metrics.recovery_success_rate,
            },
        }
    }

    pub fn dashboard(&self) -> HealthDashboard {
        let attention = self
            .all_accounts_health()
            .into_iter()
            .filter(|a| a.status != HealthStatus::Healthy || a.needs_relink)
            .collect();

        HealthDashboard {
            snapshot: self.health_snapshot(),
            trend: self.health_trend(DASHBOARD_TREND),
            attention,
            monitoring_active: self.is_monitoring(),
        }
    }

    pub fn report(&self) -> HealthReport {
        let accounts = self.all_accounts_health();
        let overall = accounts.iter().map(|a| a.status).max().unwrap_or(HealthStatus::Healthy);

        HealthReport {
            generated_at: Utc::now(),
            overall,
            metrics: self.system_metrics(),
            recommendations: recommendations(&accounts, self.config.failure_threshold),
            accounts,
            history: self.health_trend(self.config.history_limit),
        }
    }

    /// Stop checks and clear the registry.
    pub fn shutdown(&self) {
        self.stop_health_checks();
        self.accounts.clear();
        info!("health monitor shut down");
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        if let Some(handle) = self.sweep_task.get_mut().take() {
            handle.abort();
        }
    }
}

/// Call `initialize` and wait for the ready signal.
async fn reinitialize(transport: Arc<dyn Transport>) -> Result<(), TransportError> {
    let mut events = transport.subscribe();
    transport.initialize().await?;

    loop {
        if transport.is_ready() {
            return Ok(());
        }
        match events.recv().await {
            Ok(TransportEvent::Ready) => return Ok(()),
            Ok(TransportEvent::Error(e)) if e.counts_toward_breaker() => return Err(e),
            Ok(_) | Err(RecvError::Lagged(_)) => {},
            Err(RecvError::Closed) => {
                return Err(TransportError::critical("transport event stream closed"));
            },
        }
    }
}
