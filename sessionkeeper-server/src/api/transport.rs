//! Sidecar event webhook.

use axum::{extract::State, http::StatusCode, response::Json};
use tracing::debug;

use sessionkeeper_core::SidecarEvent;

use crate::state::AppState;

/// Hand a sidecar event to the account's transport, which re-broadcasts it
/// to the connection manager.
pub async fn ingest_event(
    State(state): State<AppState>,
    Json(event): Json<SidecarEvent>,
) -> Result<StatusCode, (StatusCode, String)> {
    let account_id = event.account_id().to_string();
    let transport = state
        .sidecar(&account_id)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("unknown account: {account_id}")))?;

    debug!(account_id = %account_id, "webhook event received");
    transport.ingest(event);
    Ok(StatusCode::ACCEPTED)
}
