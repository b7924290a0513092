//! # SessionKeeper Core
//!
//! Connection lifecycle and health supervision for long-lived
//! browser-automation messaging sessions, one per account.
//!
//! ## Architecture
//!
//! ```text
//! sessionkeeper-core/src/
//! ├── connection/   # per-account state machine, backoff, circuit breaker, timers
//! ├── health/       # process-wide probes, auto-recovery, reports
//! ├── transport/    # Transport trait, sidecar adapter, error classification
//! ├── store/        # persisted account records (JSON files / in-memory)
//! ├── process.rs    # browser process + profile lock cleanup
//! ├── config.rs     # supervisor config file in the data dir
//! └── logger.rs     # tracing subscriber setup
//! ```
//!
//! A [`ConnectionManager`] reacts to its transport's events; the
//! [`HealthMonitor`] only ever probes transports and re-initializes them.

#![cfg_attr(test, allow(clippy::panic, clippy::float_cmp, clippy::unwrap_used))]

pub mod config;
pub mod connection;
pub mod error;
pub mod health;
pub mod logger;
pub mod process;
pub mod store;
pub mod transport;

pub use sessionkeeper_types as types;

// Re-export commonly used types
pub use connection::{ConnectionManager, ErrorOutcome, SmartRecovery};
pub use error::{CoreError, CoreResult};
pub use health::{HealthMonitor, RecoveryOutcome};
pub use process::{CleanupReport, ProcessSupervisor, SysinfoSupervisor};
pub use store::{AccountStore, JsonAccountStore, MemoryAccountStore};
pub use transport::{SidecarEvent, SidecarTransport, Transport, TransportEvent};
