//! API Routes
//!
//! Read-only health and status views, the operator re-link trigger and the
//! sidecar event webhook.

mod accounts;
mod health;
mod transport;

#[cfg(test)]
mod accounts_tests;
#[cfg(test)]
mod health_tests;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        // Health
        .route("/health", get(health::get_snapshot))
        .route("/health/dashboard", get(health::get_dashboard))
        .route("/health/report", get(health::get_report))
        .route("/health/trend", get(health::get_trend))
        // Accounts
        .route("/accounts", get(accounts::list_accounts))
        .route("/accounts/:account_id/status", get(accounts::get_account_status))
        .route("/accounts/:account_id/relink", post(accounts::relink_account))
        // Transport
        .route("/transport/events", post(transport::ingest_event))
}
