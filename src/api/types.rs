//! API response types
//!
//! Per-target records and the snapshot are served in their own camelCase
//! shape (see [`crate::TargetStatus`] and [`crate::SystemStatusSnapshot`]).
//! The types here wrap them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::TargetStatus;

/// Response for GET /api/v1/health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub store: StoreHealth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreHealth {
    pub healthy: bool,
    pub message: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Response for GET /api/v1/targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetsResponse {
    pub targets: Vec<TargetStatus>,
    pub count: usize,
}
