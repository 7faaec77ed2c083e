//! Monitor lifecycle and metric history endpoints

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::debug;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::ApiState;
use crate::api::types::{DeleteResponse, MetricsParams, MetricsResponse, MonitorsResponse};
use crate::{CreateMonitorRequest, Monitor, MonitorId};

fn parse_id(raw: &str) -> ApiResult<MonitorId> {
    Uuid::parse_str(raw)
        .map_err(|e| ApiError::InvalidRequest(format!("invalid monitor id '{}': {}", raw, e)))
}

/// GET /api/v1/monitors
///
/// List all monitors with their cached status
pub async fn list_monitors(State(state): State<ApiState>) -> ApiResult<Json<MonitorsResponse>> {
    let monitors = state.service.list_monitors().await?;

    Ok(Json(MonitorsResponse {
        count: monitors.len(),
        monitors,
    }))
}

/// POST /api/v1/monitors
///
/// Create a monitor and, if active, start probing it immediately
pub async fn create_monitor(
    State(state): State<ApiState>,
    payload: Result<Json<CreateMonitorRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Monitor>)> {
    let Json(request) =
        payload.map_err(|e| ApiError::InvalidRequest(format!("invalid request body: {}", e)))?;

    let monitor = state.service.create_monitor(request).await?;

    Ok((StatusCode::CREATED, Json(monitor)))
}

/// DELETE /api/v1/monitors/:id
///
/// Stop the monitor's job and delete it with its metrics
pub async fn delete_monitor(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let id = parse_id(&id)?;

    state.service.delete_monitor(id).await?;

    Ok(Json(DeleteResponse {
        id,
        message: "monitor deleted".to_string(),
    }))
}

/// GET /api/v1/monitors/:id/metrics?hours=N
///
/// Metrics of the last N hours (default 24), newest first, with a summary
pub async fn get_monitor_metrics(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(params): Query<MetricsParams>,
) -> ApiResult<Json<MetricsResponse>> {
    let id = parse_id(&id)?;

    debug!("querying metrics for {} (hours: {:?})", id, params.hours);

    let report = state.service.get_metrics(id, params.hours()).await?;

    Ok(Json(MetricsResponse {
        monitor_id: report.monitor_id,
        hours: report.hours,
        count: report.metrics.len(),
        summary: report.summary,
        metrics: report.metrics,
    }))
}
