//! Application State
//!
//! Holds the health monitor, one connection manager per account, the
//! account store and the sidecar transports fed by the webhook.

use anyhow::{Context, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, warn};

use sessionkeeper_core::{
    AccountStore, ConnectionManager, HealthMonitor, SidecarTransport, SysinfoSupervisor,
};
use sessionkeeper_types::{AccountRecord, AccountSpec, SupervisorConfig};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub config: SupervisorConfig,
    pub store: Arc<dyn AccountStore>,
    pub monitor: Arc<HealthMonitor>,
    pub managers: DashMap<String, Arc<ConnectionManager>>,
    pub sidecars: DashMap<String, Arc<SidecarTransport>>,
}

impl AppState {
    pub fn new(
        config: SupervisorConfig,
        store: Arc<dyn AccountStore>,
        monitor: Arc<HealthMonitor>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                monitor,
                managers: DashMap::new(),
                sidecars: DashMap::new(),
            }),
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.inner.store
    }

    pub fn monitor(&self) -> &Arc<HealthMonitor> {
        &self.inner.monitor
    }

    /// Wire a configured account: sidecar transport, connection manager,
    /// stored record and health registration.
    pub fn add_account(&self, spec: &AccountSpec) -> Result<Arc<ConnectionManager>> {
        let transport = Arc::new(
            SidecarTransport::new(&spec.id, spec.session_path.clone(), &self.inner.config.sidecar)
                .with_context(|| format!("failed to create transport for {}", spec.id))?,
        );

        let mut manager = ConnectionManager::new(
            &spec.id,
            transport.clone(),
            self.inner.config.connection.clone(),
        )
        .with_store(Arc::clone(&self.inner.store))
        .with_supervisor(Arc::new(SysinfoSupervisor::new()));
        if let Some(path) = &spec.session_path {
            manager = manager.with_session_path(path);
        }

        let display_name = spec.display_name.clone().unwrap_or_else(|| spec.id.clone());
        let session_path = spec.session_path.clone();
        self.inner
            .store
            .update(&spec.id, &mut |record: &mut AccountRecord| {
                record.display_name = display_name.clone();
                record.session_path = session_path.clone();
            })
            .with_context(|| format!("failed to store account {}", spec.id))?;

        self.inner.sidecars.insert(spec.id.clone(), transport);
        Ok(self.insert_manager(Arc::new(manager)))
    }

    /// Track an already-built manager and register its transport for health checks.
    pub fn insert_manager(&self, manager: Arc<ConnectionManager>) -> Arc<ConnectionManager> {
        let id = manager.account_id().to_string();
        self.inner.monitor.register_account(&id, Some(manager.transport()));
        self.inner.managers.insert(id, Arc::clone(&manager));
        manager
    }

    pub fn manager(&self, account_id: &str) -> Option<Arc<ConnectionManager>> {
        self.inner.managers.get(account_id).map(|m| Arc::clone(m.value()))
    }

    pub fn sidecar(&self, account_id: &str) -> Option<Arc<SidecarTransport>> {
        self.inner.sidecars.get(account_id).map(|t| Arc::clone(t.value()))
    }

    /// Managers sorted by account id.
    pub fn managers(&self) -> Vec<Arc<ConnectionManager>> {
        let mut managers: Vec<_> = self.inner.managers.iter().map(|m| Arc::clone(m.value())).collect();
        managers.sort_by(|a, b| a.account_id().cmp(b.account_id()));
        managers
    }

    /// Start every session in the background.
    pub fn start_all(&self) {
        for manager in self.managers() {
            spawn_start(manager);
        }
    }

    pub async fn shutdown(&self) {
        self.inner.monitor.shutdown();
        for manager in self.managers() {
            manager.destroy().await;
        }
        info!("all sessions torn down");
    }
}

/// Run `start` detached; failures are already handled by the manager.
pub fn spawn_start(manager: Arc<ConnectionManager>) {
    tokio::spawn(async move {
        if let Err(e) = manager.start().await {
            warn!(account_id = %manager.account_id(), error = %e, "session start failed");
        }
    });
}
