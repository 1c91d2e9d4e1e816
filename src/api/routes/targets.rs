//! Per-target status endpoints

use axum::{
    Json,
    extract::{Path, State},
};

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::TargetsResponse,
};
use crate::{Target, TargetStatus};

/// GET /api/v1/targets
///
/// Status of every target from the last completed round
pub async fn list_targets(State(state): State<ApiState>) -> ApiResult<Json<TargetsResponse>> {
    let targets = state
        .store
        .get_all()
        .await?
        .ok_or(ApiError::NotYetAvailable)?;

    Ok(Json(TargetsResponse {
        count: targets.len(),
        targets,
    }))
}

/// GET /api/v1/targets/:host/:port
///
/// Status of a single target
pub async fn get_target(
    State(state): State<ApiState>,
    Path((host, port)): Path<(String, u16)>,
) -> ApiResult<Json<TargetStatus>> {
    let target = Target::new(host, port);

    if !state.fleet.targets().contains(&target) {
        return Err(ApiError::NotFound(format!("unknown target {target}")));
    }

    let targets = state
        .store
        .get_all()
        .await?
        .ok_or(ApiError::NotYetAvailable)?;

    targets
        .into_iter()
        .find(|status| status.target == target)
        .map(Json)
        .ok_or(ApiError::NotYetAvailable)
}
