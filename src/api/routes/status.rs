//! System status snapshot and on-demand refresh

use axum::{Json, extract::State};

use crate::SystemStatusSnapshot;
use crate::actors::messages::RoundSummary;
use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
};

/// GET /api/v1/status
///
/// Aggregate snapshot of the last completed round
pub async fn get_status(State(state): State<ApiState>) -> ApiResult<Json<SystemStatusSnapshot>> {
    state
        .store
        .get_snapshot()
        .await?
        .map(Json)
        .ok_or(ApiError::NotYetAvailable)
}

/// POST /api/v1/refresh
///
/// Runs a round now and returns its summary once published
pub async fn refresh(State(state): State<ApiState>) -> ApiResult<Json<RoundSummary>> {
    let summary = state.fleet.poll_now().await?;
    Ok(Json(summary))
}
