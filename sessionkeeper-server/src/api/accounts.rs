//! Account handlers: list, per-account status, operator re-link

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use tracing::info;

use sessionkeeper_types::{AccountRecord, ConnectionState, DetailedConnectionStatus, LastKnownState};

use crate::state::{spawn_start, AppState};

#[derive(Debug, Serialize)]
pub struct AccountInfo {
    pub id: String,
    pub display_name: String,
    pub device_linked: bool,
    pub requires_qr_code: bool,
    pub last_known_state: LastKnownState,
    /// Live state; `None` when the account is stored but not supervised
    pub state: Option<ConnectionState>,
    pub latest_qr: Option<String>,
}

pub async fn list_accounts(
    State(state): State<AppState>,
) -> Result<Json<Vec<AccountInfo>>, (StatusCode, String)> {
    let records =
        state.store().list().map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let infos = records
        .into_iter()
        .map(|record| {
            let manager = state.manager(&record.id);
            AccountInfo {
                state: manager.as_ref().map(|m| m.state()),
                latest_qr: manager.as_ref().and_then(|m| m.latest_qr()),
                id: record.id,
                display_name: record.display_name,
                device_linked: record.device_linked,
                requires_qr_code: record.requires_qr_code,
                last_known_state: record.last_known_state,
            }
        })
        .collect();

    Ok(Json(infos))
}

pub async fn get_account_status(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<DetailedConnectionStatus>, (StatusCode, String)> {
    let manager = state
        .manager(&account_id)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("unknown account: {account_id}")))?;
    Ok(Json(manager.detailed_status()))
}

#[derive(Debug, Serialize)]
pub struct RelinkResponse {
    pub account_id: String,
    pub record: Option<AccountRecord>,
}

/// Drop the session, mark the record for a fresh QR link and restart it
/// so a new QR code is emitted.
pub async fn relink_account(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<RelinkResponse>, (StatusCode, String)> {
    let manager = state
        .manager(&account_id)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("unknown account: {account_id}")))?;

    let record =
        manager.relink().await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    info!(account_id = %account_id, "operator re-link requested");
    spawn_start(manager);

    Ok(Json(RelinkResponse { account_id, record }))
}
