//! Health monitor views.

use axum::extract::{Query, State};
use axum::response::Json;
use serde::Deserialize;

use sessionkeeper_types::{HealthDashboard, HealthReport, HealthSnapshot, SweepSummary};

use crate::state::AppState;

const DEFAULT_TREND: usize = 10;

pub async fn get_snapshot(State(state): State<AppState>) -> Json<HealthSnapshot> {
    Json(state.monitor().health_snapshot())
}

pub async fn get_dashboard(State(state): State<AppState>) -> Json<HealthDashboard> {
    Json(state.monitor().dashboard())
}

pub async fn get_report(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.monitor().report())
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendQuery {
    pub last: Option<usize>,
}

pub async fn get_trend(
    State(state): State<AppState>,
    Query(query): Query<TrendQuery>,
) -> Json<Vec<SweepSummary>> {
    Json(state.monitor().health_trend(query.last.unwrap_or(DEFAULT_TREND)))
}
