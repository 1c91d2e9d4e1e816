//! Status store trait definition
//!
//! This module defines the `StatusStore` trait that every backend implements.

use async_trait::async_trait;

use super::error::StorageResult;
use crate::{SystemStatusSnapshot, TargetStatus};

/// Everything published by one completed round
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedRound {
    pub statuses: Vec<TargetStatus>,
    pub snapshot: SystemStatusSnapshot,
}

/// Health status of the store backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: std::collections::HashMap<String, String>,
}

/// Holder of the latest published round
///
/// The fleet monitor is the only writer. Readers are arbitrary and concurrent.
///
/// ## Guarantees
///
/// - `publish` replaces the whole previous state in one indivisible step,
///   readers observe either the old round or the new one, never a mix
/// - reads never wait for an in-flight round
/// - `None` means no round has completed yet, which is distinct from a
///   published round with an empty target set
///
/// Implementations must be `Send + Sync` as they are shared between the
/// monitor task and the query surface.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Replace the stored state with a new round
    async fn publish(
        &self,
        batch: Vec<TargetStatus>,
        snapshot: SystemStatusSnapshot,
    ) -> StorageResult<()>;

    /// The last published round, or `None` before the first one
    async fn latest(&self) -> StorageResult<Option<PublishedRound>>;

    /// Per-target records of the last round
    async fn get_all(&self) -> StorageResult<Option<Vec<TargetStatus>>> {
        Ok(self.latest().await?.map(|round| round.statuses))
    }

    /// Aggregate snapshot of the last round
    async fn get_snapshot(&self) -> StorageResult<Option<SystemStatusSnapshot>> {
        Ok(self.latest().await?.map(|round| round.snapshot))
    }

    /// Lightweight check that the backend is operational
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Release backend resources
    async fn close(&self) -> StorageResult<()>;
}
