//! Status store backends
//!
//! The store holds the latest published round. The fleet monitor is its only
//! writer; the query surface reads it on demand.
//!
//! ## Backends
//!
//! - **In-Memory** (default): latest round only, lost on restart
//! - **SQLite** (feature `storage-sqlite`): latest round persisted to disk
//!
//! ## Usage
//!
//! ```no_run
//! use fleet_monitor::config::StorageConfig;
//! use fleet_monitor::storage::open_store;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = open_store(&StorageConfig::None).await?;
//!     assert!(store.get_snapshot().await?.is_none());
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tracing::info;

use crate::config::StorageConfig;

pub mod backend;
pub mod error;
pub mod memory;
#[cfg(feature = "storage-sqlite")]
pub mod schema;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use backend::{HealthStatus, PublishedRound, StatusStore};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;

/// Open the configured store backend
pub async fn open_store(config: &StorageConfig) -> StorageResult<Arc<dyn StatusStore>> {
    match config {
        StorageConfig::None => {
            info!("using in-memory status store");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "storage-sqlite")]
        StorageConfig::Sqlite { path } => Ok(Arc::new(sqlite::SqliteStore::new(path).await?)),
        #[cfg(not(feature = "storage-sqlite"))]
        StorageConfig::Sqlite { .. } => Err(StorageError::ConnectionFailed(
            "built without the storage-sqlite feature".to_string(),
        )),
    }
}
