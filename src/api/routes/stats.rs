//! System statistics endpoint

use axum::{Json, extract::State};

use crate::api::error::ApiResult;
use crate::api::state::ApiState;
use crate::api::types::{ProbeSlots, StatsResponse};

/// GET /api/v1/stats
///
/// Returns runtime statistics: running jobs, observers, probe slots and storage
pub async fn get_stats(State(state): State<ApiState>) -> ApiResult<Json<StatsResponse>> {
    let registry = state.service.registry();
    let storage = state.service.storage().get_stats().await?;

    Ok(Json(StatsResponse {
        timestamp: chrono::Utc::now().to_rfc3339(),
        running_jobs: registry.running_count().await,
        observers: state.hub.observer_count().await,
        probe_slots: ProbeSlots {
            capacity: registry.limiter().capacity(),
            in_flight: registry.limiter().in_flight(),
        },
        storage,
    }))
}
