use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;

use sessionkeeper_core::transport::scripted::{InitBehavior, ScriptedTransport};
use sessionkeeper_core::{AccountStore, SidecarEvent, Transport};
use sessionkeeper_types::{AccountSpec, ConnectionState, LastKnownState};

use super::accounts::{get_account_status, list_accounts, relink_account};
use super::transport::ingest_event;
use crate::test_helpers::{add_scripted_account, test_app_state};

#[tokio::test]
async fn test_status_for_unknown_account() {
    let (state, _tmp) = test_app_state();
    let err = get_account_status(State(state), Path("ghost".to_string())).await.unwrap_err();
    assert_eq!(err.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_after_start() {
    let (state, _tmp) = test_app_state();
    let manager = add_scripted_account(&state, "sales", Arc::new(ScriptedTransport::default()));
    manager.start().await.unwrap();

    let Json(status) = get_account_status(State(state), Path("sales".to_string())).await.unwrap();
    assert_eq!(status.status.state, ConnectionState::Connected);
    assert!(status.status.is_connected);
    assert_eq!(status.metrics.total_connections, 1);
}

#[tokio::test]
async fn test_list_merges_store_and_live_state() {
    let (state, _tmp) = test_app_state();
    let manager = add_scripted_account(&state, "sales", Arc::new(ScriptedTransport::default()));
    manager.start().await.unwrap();

    let Json(accounts) = list_accounts(State(state)).await.unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].id, "sales");
    assert!(accounts[0].device_linked);
    assert_eq!(accounts[0].last_known_state, LastKnownState::Connected);
    assert_eq!(accounts[0].state, Some(ConnectionState::Connected));
}

#[tokio::test]
async fn test_relink_marks_record_and_restarts() {
    let (state, _tmp) = test_app_state();
    let transport = Arc::new(ScriptedTransport::default());
    let manager = add_scripted_account(&state, "sales", transport.clone());
    manager.start().await.unwrap();
    transport.set_behavior(InitBehavior::StayPending);

    let Json(response) =
        relink_account(State(state.clone()), Path("sales".to_string())).await.unwrap();
    let record = response.record.unwrap();
    assert!(record.requires_qr_code);
    assert_eq!(record.last_known_state, LastKnownState::Relinking);
    assert_eq!(transport.destroy_calls(), 1);

    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(transport.init_calls(), 2);
    assert_eq!(manager.state(), ConnectionState::Connecting);
}

#[tokio::test]
async fn test_relink_unknown_account() {
    let (state, _tmp) = test_app_state();
    let err = relink_account(State(state), Path("ghost".to_string())).await.unwrap_err();
    assert_eq!(err.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_webhook_routes_event_to_sidecar() {
    let (state, _tmp) = test_app_state();
    let spec = AccountSpec { id: "sales".to_string(), display_name: None, session_path: None };
    state.add_account(&spec).unwrap();

    let status = ingest_event(
        State(state.clone()),
        Json(SidecarEvent::Ready { account_id: "sales".to_string(), pid: Some(99) }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::ACCEPTED);

    let sidecar = state.sidecar("sales").unwrap();
    assert!(sidecar.is_ready());
    assert_eq!(sidecar.browser_pid(), Some(99));
    assert_eq!(state.store().load("sales").unwrap().unwrap().display_name, "sales");
}

#[tokio::test]
async fn test_webhook_rejects_unknown_account() {
    let (state, _tmp) = test_app_state();
    let err = ingest_event(
        State(state),
        Json(SidecarEvent::Disconnected { account_id: "ghost".to_string(), reason: "x".to_string() }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, StatusCode::NOT_FOUND);
}
