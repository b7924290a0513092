//! Test helpers for sessionkeeper-server unit tests.

use std::sync::Arc;

use tempfile::TempDir;

use sessionkeeper_core::transport::scripted::ScriptedTransport;
use sessionkeeper_core::{ConnectionManager, HealthMonitor, JsonAccountStore};
use sessionkeeper_types::SupervisorConfig;

use crate::state::AppState;

/// Create a minimal `AppState` backed by a JSON store in a temp dir.
///
/// Returns `(AppState, TempDir)`; keep `TempDir` alive for the test duration.
pub fn test_app_state() -> (AppState, TempDir) {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let store = Arc::new(JsonAccountStore::open(temp_dir.path()).expect("failed to open store"));
    let config = SupervisorConfig::default();
    let monitor = HealthMonitor::with_config(config.health.clone(), store.clone());

    (AppState::new(config, store, monitor), temp_dir)
}

/// Supervise `account_id` through a scripted transport.
pub fn add_scripted_account(
    state: &AppState,
    account_id: &str,
    transport: Arc<ScriptedTransport>,
) -> Arc<ConnectionManager> {
    let manager = ConnectionManager::new(account_id, transport, state.config().connection.clone())
        .with_store(Arc::clone(state.store()));
    state.insert_manager(Arc::new(manager))
}
