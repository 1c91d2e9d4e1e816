//! Health check endpoint

use axum::{Json, extract::State};

use crate::api::state::ApiState;
use crate::api::types::{HealthResponse, StoreHealth};

/// GET /api/v1/health
///
/// Reports whether the hub and its status store are operational
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    let store = match state.store.health_check().await {
        Ok(health) => StoreHealth {
            healthy: health.healthy,
            message: health.message,
            metadata: health.metadata,
        },
        Err(e) => StoreHealth {
            healthy: false,
            message: e.to_string(),
            metadata: Default::default(),
        },
    };

    Json(HealthResponse {
        status: if store.healthy { "ok" } else { "degraded" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        store,
    })
}
