//! API shared state

use std::sync::Arc;

use crate::actors::fleet::FleetHandle;
use crate::storage::StatusStore;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Read side of the status store
    pub store: Arc<dyn StatusStore>,

    /// Handle to the fleet monitor for on-demand rounds
    pub fleet: FleetHandle,
}

impl ApiState {
    pub fn new(store: Arc<dyn StatusStore>, fleet: FleetHandle) -> Self {
        Self { store, fleet }
    }
}
