//! In-memory status store (no persistence)
//!
//! Holds only the latest published round behind an `Arc`. Publishing swaps
//! the `Arc`, so the write lock is held for a pointer assignment and readers
//! never wait on a round that is still probing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use super::backend::{HealthStatus, PublishedRound, StatusStore};
use super::error::StorageResult;
use crate::{SystemStatusSnapshot, TargetStatus};

/// In-memory status store
#[derive(Debug, Default)]
pub struct MemoryStore {
    current: RwLock<Option<Arc<PublishedRound>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusStore for MemoryStore {
    async fn publish(
        &self,
        batch: Vec<TargetStatus>,
        snapshot: SystemStatusSnapshot,
    ) -> StorageResult<()> {
        let round = Arc::new(PublishedRound {
            statuses: batch,
            snapshot,
        });

        trace!("publishing {} target statuses", round.statuses.len());
        *self.current.write().await = Some(round);

        Ok(())
    }

    async fn latest(&self) -> StorageResult<Option<PublishedRound>> {
        let current = self.current.read().await.clone();
        Ok(current.map(|round| round.as_ref().clone()))
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let targets = self
            .current
            .read()
            .await
            .as_ref()
            .map(|round| round.statuses.len());

        Ok(HealthStatus {
            healthy: true,
            message: "In-memory store operational".to_string(),
            metadata: HashMap::from([
                ("backend".to_string(), "memory".to_string()),
                ("published".to_string(), targets.is_some().to_string()),
                ("targets".to_string(), targets.unwrap_or_default().to_string()),
            ]),
        })
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory store (no-op)");
        Ok(())
    }
}
