use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::instrument;

use super::aggregate::{DashboardSummary, RECENT_LIMIT};
use crate::{
    auth::extractors::AdminSession,
    error::AppResult,
    payments::pricing::{levels, LevelPrice, CURRENCY},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/settings", get(settings))
}

pub async fn load_summary(state: &AppState) -> AppResult<DashboardSummary> {
    Ok(state.dashboard.dashboard(RECENT_LIMIT).await?)
}

#[instrument(skip(state, _admin))]
pub async fn dashboard(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> AppResult<Json<DashboardSummary>> {
    Ok(Json(load_summary(&state).await?))
}

/// Read-only view of how the portal is configured.
#[derive(Debug, Serialize)]
pub struct SettingsView {
    pub department: String,
    pub email_domain: String,
    pub payment_gateway: &'static str,
    pub currency: &'static str,
    pub levels: Vec<LevelPrice>,
    pub reconcile_interval_secs: u64,
}

impl SettingsView {
    pub fn from_state(state: &AppState) -> Self {
        let portal = &state.config.portal;
        Self {
            department: portal.department.clone(),
            email_domain: portal.email_domain.clone(),
            payment_gateway: state.gateway.name(),
            currency: CURRENCY,
            levels: levels(),
            reconcile_interval_secs: portal.reconcile_interval.as_secs(),
        }
    }
}

#[instrument(skip(state, _admin))]
pub async fn settings(State(state): State<AppState>, _admin: AdminSession) -> Json<SettingsView> {
    Json(SettingsView::from_state(&state))
}
