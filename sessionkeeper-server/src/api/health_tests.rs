use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Json;

use sessionkeeper_core::transport::scripted::ScriptedTransport;
use sessionkeeper_types::HealthStatus;

use super::health::{get_dashboard, get_report, get_snapshot, get_trend, TrendQuery};
use crate::test_helpers::{add_scripted_account, test_app_state};

#[tokio::test]
async fn test_snapshot_empty() {
    let (state, _tmp) = test_app_state();
    let Json(snapshot) = get_snapshot(State(state)).await;
    assert_eq!(snapshot.status, HealthStatus::Healthy);
    assert!(snapshot.accounts.is_empty());
    assert_eq!(snapshot.metrics.total_checks, 0);
}

#[tokio::test]
async fn test_snapshot_reflects_last_sweep() {
    let (state, _tmp) = test_app_state();
    add_scripted_account(&state, "sales", Arc::new(ScriptedTransport::ready()));
    add_scripted_account(&state, "support", Arc::new(ScriptedTransport::default()));
    state.monitor().perform_health_checks().await;

    let Json(snapshot) = get_snapshot(State(state.clone())).await;
    assert_eq!(snapshot.status, HealthStatus::Unhealthy);
    assert_eq!(snapshot.accounts.len(), 2);
    assert_eq!(snapshot.accounts[0].id, "sales");
    assert_eq!(snapshot.accounts[0].status, HealthStatus::Healthy);
    assert_eq!(snapshot.accounts[1].consecutive_failures, 1);

    let Json(dashboard) = get_dashboard(State(state.clone())).await;
    assert_eq!(dashboard.attention.len(), 1);
    assert_eq!(dashboard.attention[0].account_id, "support");

    let Json(report) = get_report(State(state)).await;
    assert_eq!(report.overall, HealthStatus::Unhealthy);
    assert_eq!(report.accounts.len(), 2);
}

#[tokio::test]
async fn test_trend_limit() {
    let (state, _tmp) = test_app_state();
    for _ in 0..4 {
        state.monitor().perform_health_checks().await;
    }

    let Json(trend) = get_trend(State(state.clone()), Query(TrendQuery { last: Some(2) })).await;
    assert_eq!(trend.len(), 2);

    let Json(trend) = get_trend(State(state), Query(TrendQuery::default())).await;
    assert_eq!(trend.len(), 4);
}
