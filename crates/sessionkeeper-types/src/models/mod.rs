//! Core domain models for SessionKeeper.

mod account;
mod config;
mod connection;
mod health;

// Re-export all models
pub use account::{AccountRecord, LastKnownState};
pub use config::{AccountSpec, ConnectionConfig, HealthConfig, SidecarConfig, SupervisorConfig};
pub use connection::{
    ConnectionMetricsView, ConnectionState, ConnectionStatus, DetailedConnectionStatus,
    StateTransition,
};
pub use health::{
    AccountHealthEntry, AccountHealthView, HealthDashboard, HealthReport, HealthSnapshot,
    HealthStatus, Recommendation, SnapshotMetrics, SweepSummary, SystemMetrics,
};
