//! SessionKeeper Server - Headless Daemon
//!
//! Supervises one messaging session per configured account:
//! - A connection manager per account (reconnect backoff, circuit breaker, QR handling)
//! - A process-wide health monitor with automatic recovery
//! - A read-only REST API on /api/* plus a webhook for sidecar events
//!
//! Access via: http://localhost:8046

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

mod api;
mod cli;
mod commands;
mod router;
mod server_utils;
mod state;

#[cfg(test)]
mod test_helpers;

use cli::{Cli, Commands};
use sessionkeeper_core::{config as core_config, logger, HealthMonitor, JsonAccountStore};
use state::AppState;

const LOG_DIR: &str = "logs";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = match cli.data_dir.clone() {
        Some(dir) => dir,
        None => core_config::get_data_dir().context("Failed to resolve data directory")?,
    };

    match cli.command {
        None | Some(Commands::Serve) => {
            let log_dir = data_dir.join(LOG_DIR);
            let _guard = logger::init_logging(&cli.log_level, Some(&log_dir))?;
            serve(cli.port, data_dir).await
        },
        Some(Commands::Status { json }) => commands::handle_status(cli.port, json).await,
        Some(Commands::Accounts { json }) => commands::handle_accounts(&data_dir, json),
        Some(Commands::Relink { account_id }) => {
            commands::handle_relink(cli.port, &account_id).await
        },
    }
}

async fn serve(port: u16, data_dir: PathBuf) -> Result<()> {
    info!("SessionKeeper starting on port {}...", port);

    let state = build_state(&data_dir)?;
    info!(
        accounts = state.managers().len(),
        check_interval_secs = state.config().health.check_interval_secs,
        data_dir = %data_dir.display(),
        "state initialized"
    );

    state.start_all();
    state.monitor().start_health_checks();

    let app = router::build_router(state.clone());
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).with_graceful_shutdown(server_utils::shutdown_signal()).await?;

    state.shutdown().await;
    Ok(())
}

fn build_state(data_dir: &Path) -> Result<AppState> {
    let config = core_config::load_config(data_dir).context("Failed to load configuration")?;
    let store = Arc::new(JsonAccountStore::open(data_dir)?);
    let monitor = HealthMonitor::with_config(config.health.clone(), store.clone());

    let state = AppState::new(config.clone(), store, monitor);
    for spec in &config.accounts {
        state.add_account(spec)?;
    }
    Ok(state)
}
