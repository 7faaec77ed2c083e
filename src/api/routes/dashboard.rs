//! Dashboard aggregate endpoint

use axum::{Json, extract::State};

use crate::api::error::ApiResult;
use crate::api::state::ApiState;
use crate::service::DashboardStats;

/// GET /api/v1/dashboard/stats
pub async fn get_dashboard_stats(State(state): State<ApiState>) -> ApiResult<Json<DashboardStats>> {
    Ok(Json(state.service.dashboard_stats().await?))
}
