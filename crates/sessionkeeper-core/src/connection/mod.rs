//! Per-account connection lifecycle.
//!
//! A [`ConnectionManager`] owns one account's state machine:
//!
//! ```text
//!   Idle ──start──▶ Connecting ──ready──▶ Connected ──disconnected──▶ Disconnected
//!                       │                     │                            │
//!                       └──────error──────────┴──▶ Error ◀─────────────────┘
//!                                                   │ error_count >= threshold
//!                                                   ▼
//!                                               Suspended ──cooldown──▶ Disconnected
//! ```
//!
//! Reconnects back off exponentially. Repeated critical errors trip a
//! circuit breaker whose cooldown grows with every trip. All timers are tokio
//! tasks owned by the manager and aborted on [`ConnectionManager::destroy`].
//!
//! Lock order: the lifecycle mutex is never held while a timer slot is
//! locked, and never across an `.await` or a store write.

mod backoff;
mod events;
mod state;
mod timers;


pub use backoff::{backoff_delay, progressive_cooldown, COOLDOWN_SCHEDULE};

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use sessionkeeper_types::{
    AccountRecord, ConnectionConfig, ConnectionState, ConnectionStatus, DetailedConnectionStatus,
    ErrorClass, TransportError,
};
use tracing::{debug, info, warn};

use crate::error::{CoreError, CoreResult};
use crate::process::{CleanupReport, ProcessSupervisor};
use crate::store::AccountStore;
use crate::transport::Transport;

use state::Lifecycle;
use timers::Timers;

/// Disconnect reasons meaning the device link itself is gone.
const LOGOUT_REASONS: [&str; 3] = ["logout", "logged out", "unpaired"];

/// What [`ConnectionManager::handle_error`] did with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOutcome {
    /// Benign automation race; metrics only
    Transient,
    /// Critical error below the breaker threshold; reconnect scheduled
    Reconnect,
    /// Lock/profile conflict handed to external cleanup
    ExternalCleanup,
    /// Threshold reached; breaker tripped with this cooldown
    CircuitOpen(Duration),
    /// Arrived during a breaker cooldown; metrics only
    Suppressed,
}

/// Result of [`ConnectionManager::attempt_smart_recovery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmartRecovery {
    /// Plain reconnect is the remedy
    Reconnect,
    /// A stale browser or profile lock must be cleared first
    ExternalCleanup(Option<CleanupReport>),
}

pub struct ConnectionManager {
    account_id: String,
    transport: Arc<dyn Transport>,
    config: ConnectionConfig,
    session_path: Option<PathBuf>,
    store: Option<Arc<dyn AccountStore>>,
    supervisor: Option<Arc<dyn ProcessSupervisor>>,
    lifecycle: Mutex<Lifecycle>,
    timers: Timers,
    activity_touches: AtomicU64,
}

impl ConnectionManager {
    pub fn new(
        account_id: impl Into<String>,
        transport: Arc<dyn Transport>,
        config: ConnectionConfig,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            transport,
            config,
            session_path: None,
            store: None,
            supervisor: None,
            lifecycle: Mutex::new(Lifecycle::default()),
            timers: Timers::default(),
            activity_touches: AtomicU64::new(0),
        }
    }

    /// Persist lifecycle flags into `store` on every transition.
    pub fn with_store(mut self, store: Arc<dyn AccountStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Route lock-conflict errors to `supervisor`.
    pub fn with_supervisor(mut self, supervisor: Arc<dyn ProcessSupervisor>) -> Self {
        self.supervisor = Some(supervisor);
        self
    }

    pub fn with_session_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_path = Some(path.into());
        self
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    pub fn state(&self) -> ConnectionState {
        self.lifecycle.lock().state
    }

    /// Most recent accepted QR code, until the session connects.
    pub fn latest_qr(&self) -> Option<String> {
        self.lifecycle.lock().latest_qr.clone()
    }

    /// Move to `new`. Returns `false`, touching nothing, when already there.
    pub fn set_state(&self, new: ConnectionState) -> bool {
        let Some(transition) = self.lifecycle.lock().transition(new) else {
            return false;
        };

        info!(
            account_id = %self.account_id,
            from = %transition.from,
            to = %transition.to,
            "connection state changed"
        );
        self.persist(&mut |record: &mut AccountRecord| record.apply_state(new));
        true
    }

    /// Begin (or resume) the session.
    pub async fn start(self: &Arc<Self>) -> CoreResult<()> {
        let epoch = {
            let mut lc = self.lifecycle.lock();
            if lc.destroyed {
                return Err(CoreError::Account(format!("{} has been destroyed", self.account_id)));
            }
            if lc.state == ConnectionState::Suspended {
                return Err(CoreError::Account(format!(
                    "{} is suspended by the circuit breaker",
                    self.account_id
                )));
            }
            if lc.is_initializing {
                debug!(account_id = %self.account_id, "start ignored: already initializing");
                return Ok(());
            }
            lc.is_initializing = true;
            lc.epoch
        };

        self.ensure_event_pump();
        self.set_state(ConnectionState::Connecting);

        let result = self.transport.initialize().await;
        {
            let mut lc = self.lifecycle.lock();
            if lc.epoch != epoch {
                debug!(account_id = %self.account_id, "start superseded by teardown, result dropped");
                return Ok(());
            }
            lc.is_initializing = false;
        }

        match result {
            Ok(()) => {
                if self.transport.is_ready() {
                    self.handle_ready();
                }
                Ok(())
            },
            Err(err) => {
                self.handle_error(err.clone());
                Err(err.into())
            },
        }
    }

    fn ensure_event_pump(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let rx = self.transport.subscribe();
        self.timers.event_pump.arm_if_idle(|_| tokio::spawn(events::pump(weak, rx)));
    }

    /// Transport reported an authenticated session.
    pub fn handle_ready(self: &Arc<Self>) {
        {
            let mut lc = self.lifecycle.lock();
            if lc.destroyed || lc.state == ConnectionState::Connected {
                return;
            }
            if lc.metrics.total_connections > 0 {
                lc.metrics.total_recoveries += 1;
            }
            lc.is_initializing = false;
            lc.reconnect_attempts = 0;
            lc.error_count = 0;
            lc.suspended_until = None;
            lc.requires_relink = false;
            lc.connection_failure_reason = None;
            lc.latest_qr = None;
            lc.session_created_at = Some(Utc::now());
            lc.last_activity_at = Some(Utc::now());
        }

        self.timers.reconnect.cancel();
        self.timers.breaker_reset.cancel();
        self.clear_qr_timer();
        self.set_state(ConnectionState::Connected);
        self.start_keep_alive();
    }

    /// Transport dropped the session.
    pub fn handle_disconnected(self: &Arc<Self>, reason: &str) {
        self.stop_keep_alive();
        {
            let lc = self.lifecycle.lock();
            if lc.destroyed {
                return;
            }
            if lc.state == ConnectionState::Suspended {
                debug!(account_id = %self.account_id, reason, "disconnect during cooldown");
                return;
            }
        }
        self.set_state(ConnectionState::Disconnected);

        let lowered = reason.to_lowercase();
        if LOGOUT_REASONS.iter().any(|p| lowered.contains(p)) {
            warn!(account_id = %self.account_id, reason, "device logged out, re-link required");
            {
                let mut lc = self.lifecycle.lock();
                lc.requires_relink = true;
                lc.connection_failure_reason = Some(format!("logged out: {reason}"));
            }
            self.persist(&mut |record: &mut AccountRecord| record.requires_qr_code = true);
            return;
        }

        info!(account_id = %self.account_id, reason, "session disconnected");
        self.schedule_reconnect();
    }

    /// Classify and act on a transport error.
    pub fn handle_error(self: &Arc<Self>, err: TransportError) -> ErrorOutcome {
        let trip = {
            let mut lc = self.lifecycle.lock();
            lc.record_error(err.message());
            if lc.destroyed || lc.state == ConnectionState::Suspended {
                debug!(account_id = %self.account_id, error = %err, "error ignored while inactive");
                return ErrorOutcome::Suppressed;
            }
            // The session survived a benign race; it is not a new connection.
            if err.class() == ErrorClass::Transient
                && lc.state == ConnectionState::Connected
                && self.transport.is_ready()
            {
                debug!(account_id = %self.account_id, error = %err, "transient error on live session");
                return ErrorOutcome::Transient;
            }
            lc.is_initializing = false;
            if err.counts_toward_breaker() {
                lc.error_count += 1;
                lc.connection_failure_reason = Some(err.to_string());
            }
            err.counts_toward_breaker() && lc.error_count >= self.config.circuit_breaker_threshold
        };

        match err.class() {
            ErrorClass::Transient => {
                debug!(account_id = %self.account_id, error = %err, "transient transport error")
            },
            _ => warn!(account_id = %self.account_id, error = %err, "transport error"),
        }
        self.set_state(ConnectionState::Error);

        if trip {
            return ErrorOutcome::CircuitOpen(self.activate_circuit_breaker());
        }

        match err.class() {
            ErrorClass::Transient => {
                if self.transport.is_ready() {
                    self.handle_ready();
                } else {
                    self.schedule_reconnect();
                }
                ErrorOutcome::Transient
            },
            ErrorClass::Critical => {
                self.schedule_reconnect();
                ErrorOutcome::Reconnect
            },
            ErrorClass::LockConflict => {
                if let SmartRecovery::ExternalCleanup(Some(report)) = self.attempt_smart_recovery(&err)
                {
                    if !report.is_empty() {
                        self.schedule_reconnect();
                    }
                }
                ErrorOutcome::ExternalCleanup
            },
        }
    }

    /// Trip the breaker. Returns the cooldown before the automatic reset.
    pub fn activate_circuit_breaker(self: &Arc<Self>) -> Duration {
        let (trips, cooldown) = {
            let mut lc = self.lifecycle.lock();
            lc.circuit_breaker_trips = lc.circuit_breaker_trips.saturating_add(1);
            let cooldown = progressive_cooldown(lc.circuit_breaker_trips);
            lc.suspended_until = Some(tokio::time::Instant::now() + cooldown);
            lc.is_initializing = false;
            lc.connection_failure_reason =
                Some(format!("circuit breaker open after {} critical errors", lc.error_count));
            (lc.circuit_breaker_trips, cooldown)
        };

        self.timers.reconnect.cancel();
        self.set_state(ConnectionState::Suspended);

        let weak = Arc::downgrade(self);
        self.timers.breaker_reset.arm(|generation| {
            tokio::spawn(async move {
                tokio::time::sleep(cooldown).await;
                if let Some(manager) = weak.upgrade() {
                    manager.timers.breaker_reset.release(generation);
                    manager.reset_circuit_breaker();
                }
            })
        });

        warn!(
            account_id = %self.account_id,
            trips,
            cooldown_secs = cooldown.as_secs(),
            "circuit breaker opened"
        );
        cooldown
    }

    fn reset_circuit_breaker(self: &Arc<Self>) {
        {
            let mut lc = self.lifecycle.lock();
            if lc.state != ConnectionState::Suspended {
                return;
            }
            lc.error_count = 0;
            lc.reconnect_attempts = 0;
            lc.suspended_until = None;
            lc.requires_relink = false;
        }
        info!(account_id = %self.account_id, "circuit breaker reset");
        self.set_state(ConnectionState::Disconnected);
        self.schedule_reconnect();
    }

    /// Queue a reconnect with exponential backoff. Returns the delay, or
    /// `None` when refused or when attempts are exhausted.
    pub fn schedule_reconnect(self: &Arc<Self>) -> Option<Duration> {
        if self.timers.reconnect.is_active() {
            return None;
        }

        let (attempt, delay) = {
            let mut lc = self.lifecycle.lock();
            if lc.destroyed
                || lc.state == ConnectionState::Suspended
                || lc.is_initializing
                || lc.requires_relink
            {
                return None;
            }
            if lc.reconnect_attempts >= self.config.max_reconnect_attempts {
                lc.requires_relink = true;
                lc.connection_failure_reason = Some(format!(
                    "gave up after {} reconnect attempts",
                    lc.reconnect_attempts
                ));
                drop(lc);
                warn!(account_id = %self.account_id, "reconnect attempts exhausted, re-link required");
                self.set_state(ConnectionState::Error);
                return None;
            }
            let delay = backoff_delay(
                lc.reconnect_attempts,
                self.config.base_retry_delay(),
                self.config.max_retry_delay(),
            );
            lc.reconnect_attempts += 1;
            lc.metrics.total_reconnects += 1;
            (lc.reconnect_attempts, delay)
        };

        let weak = Arc::downgrade(self);
        self.timers.reconnect.arm(|generation| {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let Some(manager) = weak.upgrade() else {
                    return;
                };
                manager.timers.reconnect.release(generation);
                if let Err(e) = manager.start().await {
                    debug!(account_id = %manager.account_id, error = %e, "reconnect attempt failed");
                }
            })
        });

        info!(
            account_id = %self.account_id,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "reconnect scheduled"
        );
        Some(delay)
    }

    /// Accept a QR code unless one arrived within the debounce window.
    pub fn handle_qr(self: &Arc<Self>, code: String) -> bool {
        let now = tokio::time::Instant::now();
        let attempts = {
            let mut lc = self.lifecycle.lock();
            if let Some(last) = lc.last_qr_at {
                if now.duration_since(last) < self.config.qr_debounce() {
                    return false;
                }
            }
            lc.last_qr_at = Some(now);
            lc.qr_attempts += 1;
            lc.metrics.qr_codes_generated += 1;
            lc.latest_qr = Some(code);
            lc.qr_attempts
        };

        info!(account_id = %self.account_id, attempt = attempts, "QR code received");
        self.persist(&mut |record: &mut AccountRecord| record.requires_qr_code = true);
        self.start_qr_timer();
        true
    }

    fn start_qr_timer(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let timeout = self.config.qr_timeout();
        self.timers.qr_abandon.arm_if_idle(|generation| {
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                if let Some(manager) = weak.upgrade() {
                    manager.timers.qr_abandon.release(generation);
                    manager.abandon_qr();
                }
            })
        });
    }

    fn abandon_qr(&self) {
        let mut lc = self.lifecycle.lock();
        if lc.state != ConnectionState::Connected && lc.qr_attempts > 2 {
            debug!(account_id = %self.account_id, attempts = lc.qr_attempts, "QR attempts reset");
            lc.qr_attempts = 0;
        }
    }

    /// Cancel the abandonment timer and zero the attempt counter.
    pub fn clear_qr_timer(&self) {
        self.timers.qr_abandon.cancel();
        self.lifecycle.lock().qr_attempts = 0;
    }

    /// Start the keep-alive and health-touch intervals. Idempotent.
    pub fn start_keep_alive(self: &Arc<Self>) -> bool {
        let keep_alive =
            self.spawn_touch_interval(&self.timers.keep_alive, self.config.keep_alive_interval());
        let health = self
            .spawn_touch_interval(&self.timers.health_touch, self.config.health_check_interval());
        keep_alive || health
    }

    fn spawn_touch_interval(self: &Arc<Self>, slot: &timers::TimerSlot, period: Duration) -> bool {
        let weak = Arc::downgrade(self);
        slot.arm_if_idle(|_| {
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    let Some(manager) = weak.upgrade() else {
                        break;
                    };
                    manager.touch_activity();
                }
            })
        })
    }

    fn touch_activity(&self) {
        let mut lc = self.lifecycle.lock();
        if lc.state == ConnectionState::Connected {
            lc.last_activity_at = Some(Utc::now());
            self.activity_touches.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Stop both intervals. No-op when not running.
    pub fn stop_keep_alive(&self) {
        self.timers.keep_alive.cancel();
        self.timers.health_touch.cancel();
    }

    pub fn keep_alive_active(&self) -> bool {
        self.timers.keep_alive.is_active()
    }

    #[cfg(test)]
    pub(crate) fn activity_touches(&self) -> u64 {
        self.activity_touches.load(Ordering::Relaxed)
    }

    /// Route lock/profile conflicts to the process supervisor.
    pub fn attempt_smart_recovery(&self, err: &TransportError) -> SmartRecovery {
        if !err.needs_external_cleanup() {
            return SmartRecovery::Reconnect;
        }

        let Some(supervisor) = &self.supervisor else {
            warn!(
                account_id = %self.account_id,
                error = %err,
                "lock conflict needs cleanup but no process supervisor is configured"
            );
            return SmartRecovery::ExternalCleanup(None);
        };

        match supervisor.release_session(
            &self.account_id,
            self.transport.browser_pid(),
            self.session_path.as_deref(),
        ) {
            Ok(report) => SmartRecovery::ExternalCleanup(Some(report)),
            Err(e) => {
                warn!(account_id = %self.account_id, error = %e, "process cleanup failed");
                SmartRecovery::ExternalCleanup(None)
            },
        }
    }

    /// Operator re-link: drop the session and mark the record for a fresh QR link.
    pub async fn relink(&self) -> CoreResult<Option<AccountRecord>> {
        {
            let mut lc = self.lifecycle.lock();
            lc.epoch = lc.epoch.wrapping_add(1);
            lc.is_initializing = false;
        }
        self.timers.cancel_all();
        if let Err(e) = self.transport.destroy().await {
            warn!(account_id = %self.account_id, error = %e, "teardown failed during re-link");
        }

        {
            let mut lc = self.lifecycle.lock();
            lc.error_count = 0;
            lc.reconnect_attempts = 0;
            lc.qr_attempts = 0;
            lc.last_qr_at = None;
            lc.latest_qr = None;
            lc.suspended_until = None;
            lc.requires_relink = false;
            lc.connection_failure_reason = None;
        }
        self.set_state(ConnectionState::Idle);

        info!(account_id = %self.account_id, "account marked for re-link");
        match &self.store {
            Some(store) => {
                let record = store
                    .update(&self.account_id, &mut |r: &mut AccountRecord| r.mark_relinking())?;
                Ok(Some(record))
            },
            None => Ok(None),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        let browser_pid = self.transport.browser_pid();
        let lc = self.lifecycle.lock();
        ConnectionStatus {
            account_id: self.account_id.clone(),
            state: lc.state,
            is_connected: lc.state.is_connected(),
            uptime_ms: lc.uptime().map(|d| d.as_millis() as u64),
            reconnect_attempts: lc.reconnect_attempts,
            error_count: lc.error_count,
            circuit_breaker_trips: lc.circuit_breaker_trips,
            browser_pid,
        }
    }

    pub fn detailed_status(&self) -> DetailedConnectionStatus {
        let status = self.status();
        let lc = self.lifecycle.lock();
        DetailedConnectionStatus {
            status,
            metrics: lc.metrics_view(),
            recent_transitions: lc.recent_transitions(),
            qr_attempts: lc.qr_attempts,
            is_initializing: lc.is_initializing,
            connection_failure_reason: lc.connection_failure_reason.clone(),
            session_created_at: lc.session_created_at,
            last_activity_at: lc.last_activity_at,
            cooldown_remaining_ms: lc.cooldown_remaining().map(|d| d.as_millis() as u64),
            requires_relink: lc.requires_relink,
        }
    }

    /// Cancel every timer, tear down the transport, go `Idle`. Safe to repeat.
    /// A destroyed manager refuses to start again.
    pub async fn destroy(&self) {
        {
            let mut lc = self.lifecycle.lock();
            lc.destroyed = true;
            lc.epoch = lc.epoch.wrapping_add(1);
            lc.is_initializing = false;
        }
        let cancelled = self.timers.cancel_all();
        if let Err(e) = self.transport.destroy().await {
            warn!(account_id = %self.account_id, error = %e, "transport teardown failed");
        }
        self.set_state(ConnectionState::Idle);
        debug!(account_id = %self.account_id, cancelled, "connection manager destroyed");
    }

    fn persist(&self, apply: &mut dyn FnMut(&mut AccountRecord)) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.update(&self.account_id, apply) {
            warn!(account_id = %self.account_id, error = %e, "failed to persist account record");
        }
    }
}
