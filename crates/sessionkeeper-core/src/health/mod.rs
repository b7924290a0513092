//! Account Health Monitoring Module
//!
//! Periodically probes every registered account's transport and escalates
//! persistent failures to automatic recovery:
//! - Healthy / Warning / Unhealthy probe per account per sweep
//! - One recovery attempt per account per sweep once failures reach the threshold
//! - Never-linked or repeatedly failing accounts are surfaced for manual re-link
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  HealthMonitor                                               │
//! │  ├── accounts: DashMap<String, MonitoredAccount>            │
//! │  ├── history: bounded sweep summaries                       │
//! │  ├── sweep_task: periodic background sweep                  │
//! │  └── store: AccountStore (recovery eligibility)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod monitor;
mod report;
mod types;


pub use monitor::HealthMonitor;
pub use types::RecoveryOutcome;
