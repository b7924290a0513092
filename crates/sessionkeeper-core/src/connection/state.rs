//! Mutable per-account lifecycle record.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sessionkeeper_types::{ConnectionMetricsView, ConnectionState, StateTransition};
use tokio::time::Instant;

pub(crate) const STATE_HISTORY_LIMIT: usize = 20;
pub(crate) const SESSION_DURATION_LIMIT: usize = 10;
pub(crate) const RECENT_TRANSITIONS: usize = 5;

/// Cumulative counters plus the two bounded buffers.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
    pub total_connections: u64,
    pub total_disconnections: u64,
    pub total_reconnects: u64,
    pub total_errors: u64,
    pub total_recoveries: u64,
    pub last_error_message: Option<String>,
    pub last_error_time: Option<DateTime<Utc>>,
    pub last_connected_at: Option<DateTime<Utc>>,
    pub last_disconnected_at: Option<DateTime<Utc>>,
    pub state_history: VecDeque<StateTransition>,
    pub session_durations: VecDeque<Duration>,
    pub qr_codes_generated: u64,
}

impl Metrics {
    fn push_history(&mut self, transition: StateTransition) {
        if self.state_history.len() == STATE_HISTORY_LIMIT {
            self.state_history.pop_front();
        }
        self.state_history.push_back(transition);
    }

    fn push_session(&mut self, duration: Duration) {
        if self.session_durations.len() == SESSION_DURATION_LIMIT {
            self.session_durations.pop_front();
        }
        self.session_durations.push_back(duration);
    }

    pub fn average_session_duration(&self) -> Duration {
        if self.session_durations.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.session_durations.iter().sum();
        total / self.session_durations.len() as u32
    }
}

#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    pub state: ConnectionState,
    pub reconnect_attempts: u32,
    pub is_initializing: bool,
    pub error_count: u32,
    pub circuit_breaker_trips: u32,
    pub suspended_until: Option<Instant>,
    pub last_qr_at: Option<Instant>,
    pub qr_attempts: u32,
    pub latest_qr: Option<String>,
    /// Start of the current connected session, for uptime and durations
    pub connected_since: Option<Instant>,
    pub session_created_at: Option<DateTime<Utc>>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub connection_failure_reason: Option<String>,
    /// Automatic reconnects gave up, or the device was logged out
    pub requires_relink: bool,
    /// Bumped by teardown and re-link; an in-flight start from an older
    /// epoch discards its result
    pub epoch: u64,
    /// Set by `destroy`; the manager never reconnects again
    pub destroyed: bool,
    pub metrics: Metrics,
}

impl Lifecycle {
    /// Apply a transition. `None` when `to` is already current.
    pub fn transition(&mut self, to: ConnectionState) -> Option<StateTransition> {
        if to == self.state {
            return None;
        }

        let from = self.state;
        let at = Utc::now();
        let now = Instant::now();
        self.state = to;

        let transition = StateTransition { from, to, at };
        self.metrics.push_history(transition);

        if to == ConnectionState::Connected {
            self.metrics.total_connections += 1;
            self.metrics.last_connected_at = Some(at);
            self.connected_since = Some(now);
        }

        if from == ConnectionState::Connected {
            let since = self.connected_since.take();
            if to == ConnectionState::Disconnected {
                self.metrics.total_disconnections += 1;
                self.metrics.last_disconnected_at = Some(at);
                if let Some(since) = since {
                    self.metrics.push_session(now.duration_since(since));
                }
            }
        }

        Some(transition)
    }

    pub fn record_error(&mut self, message: &str) {
        self.metrics.total_errors += 1;
        self.metrics.last_error_message = Some(message.to_string());
        self.metrics.last_error_time = Some(Utc::now());
    }

    pub fn uptime(&self) -> Option<Duration> {
        self.connected_since.map(|since| since.elapsed())
    }

    pub fn cooldown_remaining(&self) -> Option<Duration> {
        if self.state != ConnectionState::Suspended {
            return None;
        }
        self.suspended_until.map(|until| until.saturating_duration_since(Instant::now()))
    }

    /// Last few transitions, oldest first.
    pub fn recent_transitions(&self) -> Vec<StateTransition> {
        let skip = self.metrics.state_history.len().saturating_sub(RECENT_TRANSITIONS);
        self.metrics.state_history.iter().skip(skip).copied().collect()
    }

    pub fn metrics_view(&self) -> ConnectionMetricsView {
        let m = &self.metrics;
        ConnectionMetricsView {
            total_connections: m.total_connections,
            total_disconnections: m.total_disconnections,
            total_reconnects: m.total_reconnects,
            total_errors: m.total_errors,
            total_recoveries: m.total_recoveries,
            last_error_message: m.last_error_message.clone(),
            last_error_time: m.last_error_time,
            last_connected_at: m.last_connected_at,
            last_disconnected_at: m.last_disconnected_at,
            average_session_duration_ms: m.average_session_duration().as_millis() as u64,
            recorded_sessions: m.session_durations.len(),
            qr_codes_generated: m.qr_codes_generated,
            circuit_breaker_trips: self.circuit_breaker_trips,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_bounded() {
        let mut lc = Lifecycle::default();
        for i in 0..30 {
            let to =
                if i % 2 == 0 { ConnectionState::Connecting } else { ConnectionState::Error };
            lc.transition(to);
        }
        assert_eq!(lc.metrics.state_history.len(), STATE_HISTORY_LIMIT);
        assert_eq!(lc.recent_transitions().len(), RECENT_TRANSITIONS);
        assert_eq!(lc.recent_transitions().last().map(|t| t.to), Some(ConnectionState::Error));
    }

    #[test]
    fn test_average_over_retained_sessions() {
        let mut metrics = Metrics::default();
        for secs in 1..=12u64 {
            metrics.push_session(Duration::from_secs(secs));
        }
        assert_eq!(metrics.session_durations.len(), SESSION_DURATION_LIMIT);
        // retained: 3..=12
        assert_eq!(metrics.average_session_duration(), Duration::from_millis(7_500));
    }

    #[test]
    fn test_leaving_connected_without_disconnect_clears_session() {
        let mut lc = Lifecycle::default();
        lc.transition(ConnectionState::Connected);
        lc.transition(ConnectionState::Error);
        assert!(lc.connected_since.is_none());
        assert_eq!(lc.metrics.total_disconnections, 0);
        assert!(lc.metrics.session_durations.is_empty());
    }
}
