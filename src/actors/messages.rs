//! Message types for actor communication
//!
//! 1. **Commands**: Request/response messages sent to the fleet monitor via mpsc
//! 2. **Summaries**: What a completed round reports back to its requester

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Commands that can be sent to the FleetMonitorActor
#[derive(Debug)]
pub enum FleetCommand {
    /// Run a round immediately (bypassing the interval timer)
    ///
    /// Queued behind any round already in progress, rounds never overlap.
    PollNow {
        respond_to: oneshot::Sender<anyhow::Result<RoundSummary>>,
    },

    /// Update the polling interval
    UpdateInterval { interval: Duration },

    /// Gracefully shut down the monitor
    ///
    /// The actor finishes any in-flight round and then exits.
    Shutdown,
}

/// Outcome of one completed round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSummary {
    /// Sequence number of the round, starting at 1
    pub round: u64,
    pub targets: usize,
    pub online: usize,
    pub warning: usize,
    pub offline: usize,
    /// Wall time from first probe launch to publish
    pub elapsed_ms: u64,
    pub completed_at: DateTime<Utc>,
}
