//! # SessionKeeper Types
//!
//! Core types, status views, and error definitions for SessionKeeper.
//!
//! - **`error`** - Typed error hierarchy for transports, storage, and configuration
//! - **`models`** - Domain models (connection state, account record, health views, config)
//!
//! ## Architecture Role
//!
//! `sessionkeeper-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!            sessionkeeper-types (this crate)
//!                        │
//!                        ▼
//!                sessionkeeper-core
//!                        │
//!                        ▼
//!               sessionkeeper-server
//! ```
//!
//! Everything here is plain data: serializable for the HTTP read API and
//! cheap to clone across async boundaries.

pub mod error;
pub mod models;

// Re-export error types for convenience
pub use error::{ConfigError, ErrorClass, Result, StoreError, TransportError, TypedError};

// Re-export core model types
pub use models::{
    AccountHealthEntry, AccountHealthView, AccountRecord, AccountSpec, ConnectionConfig,
    ConnectionMetricsView, ConnectionState, ConnectionStatus, DetailedConnectionStatus,
    HealthConfig, HealthDashboard, HealthReport, HealthSnapshot, HealthStatus, LastKnownState,
    Recommendation, SidecarConfig, SnapshotMetrics, StateTransition, SupervisorConfig,
    SweepSummary, SystemMetrics,
};
