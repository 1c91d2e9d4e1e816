//! SQLite status store
//!
//! Mirrors the latest published round of the running hub into a database
//! file. A round left over from an earlier run is discarded on open, so the
//! store reports "not yet available" until this process publishes.
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Readers keep seeing the previous round while a publish commits
//! - **Atomic publish**: The whole round is replaced inside one transaction

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument};

use super::backend::{HealthStatus, PublishedRound, StatusStore};
use super::error::{StorageError, StorageResult};
use super::schema::{SCHEMA, SnapshotRow, StatusRow};
use crate::{SystemStatusSnapshot, TargetStatus};

/// SQLite status store
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    db_path: String,
    /// Set by the first publish of this instance
    published: AtomicBool,
}

impl SqliteStore {
    /// Open (or create) the database and make sure the tables exist
    ///
    /// ```no_run
    /// # use fleet_monitor::storage::sqlite::SqliteStore;
    /// # async fn example() -> anyhow::Result<()> {
    /// let store = SqliteStore::new("./fleet-status.db").await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite status store at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| StorageError::SchemaFailed(e.to_string()))?;
        }

        debug!("status tables ready");

        Self::discard_previous_run(&pool).await?;

        Ok(Self {
            pool,
            db_path: db_path_str,
            published: AtomicBool::new(false),
        })
    }

    /// Drop whatever an earlier run published
    async fn discard_previous_run(pool: &Pool<Sqlite>) -> StorageResult<()> {
        let mut tx = pool.begin().await?;

        let stale = sqlx::query("DELETE FROM target_status")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM system_snapshot")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        if stale > 0 {
            info!("discarded {stale} target statuses from a previous run");
        }
        Ok(())
    }
}

#[async_trait]
impl StatusStore for SqliteStore {
    #[instrument(skip_all, fields(count = batch.len()))]
    async fn publish(
        &self,
        batch: Vec<TargetStatus>,
        snapshot: SystemStatusSnapshot,
    ) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM target_status")
            .execute(&mut *tx)
            .await?;

        for (position, status) in batch.iter().enumerate() {
            let row = StatusRow::from_status(position, status);
            sqlx::query(
                r#"
                INSERT INTO target_status (
                    host, port, position, status, cpu_percent, ram_megabytes, last_checked
                )
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(row.host)
            .bind(row.port)
            .bind(row.position)
            .bind(row.status)
            .bind(row.cpu_percent)
            .bind(row.ram_megabytes)
            .bind(row.last_checked)
            .execute(&mut *tx)
            .await?;
        }

        let row = SnapshotRow::from_snapshot(&snapshot);
        sqlx::query(
            r#"
            INSERT INTO system_snapshot (
                id, cpu_average, ram_average, ram_total, uptime_seconds, last_updated
            )
            VALUES (1, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                cpu_average = excluded.cpu_average,
                ram_average = excluded.ram_average,
                ram_total = excluded.ram_total,
                uptime_seconds = excluded.uptime_seconds,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(row.cpu_average)
        .bind(row.ram_average)
        .bind(row.ram_total)
        .bind(row.uptime_seconds)
        .bind(row.last_updated)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.published.store(true, Ordering::Release);

        debug!("round published to SQLite");
        Ok(())
    }

    async fn latest(&self) -> StorageResult<Option<PublishedRound>> {
        if !self.published.load(Ordering::Acquire) {
            return Ok(None);
        }

        // Both reads share one transaction so they see the same round.
        let mut tx = self.pool.begin().await?;

        let snapshot_row = sqlx::query(
            r#"
            SELECT cpu_average, ram_average, ram_total, uptime_seconds, last_updated
            FROM system_snapshot
            WHERE id = 1
            "#,
        )
        .fetch_optional(&mut *tx)
        .await?;

        let Some(snapshot_row) = snapshot_row else {
            tx.commit().await?;
            return Ok(None);
        };

        let snapshot = SnapshotRow {
            cpu_average: snapshot_row.try_get("cpu_average")?,
            ram_average: snapshot_row.try_get("ram_average")?,
            ram_total: snapshot_row.try_get("ram_total")?,
            uptime_seconds: snapshot_row.try_get("uptime_seconds")?,
            last_updated: snapshot_row.try_get("last_updated")?,
        }
        .into_snapshot()?;

        let rows = sqlx::query(
            r#"
            SELECT host, port, position, status, cpu_percent, ram_megabytes, last_checked
            FROM target_status
            ORDER BY position ASC
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let statuses = rows
            .into_iter()
            .map(|row| {
                StatusRow {
                    host: row.try_get("host")?,
                    port: row.try_get("port")?,
                    position: row.try_get("position")?,
                    status: row.try_get("status")?,
                    cpu_percent: row.try_get("cpu_percent")?,
                    ram_megabytes: row.try_get("ram_megabytes")?,
                    last_checked: row.try_get("last_checked")?,
                }
                .into_status()
            })
            .collect::<StorageResult<Vec<_>>>()?;

        Ok(Some(PublishedRound { statuses, snapshot }))
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        Ok(HealthStatus {
            healthy: true,
            message: "SQLite store operational".to_string(),
            metadata: HashMap::from([
                ("backend".to_string(), "sqlite".to_string()),
                ("path".to_string(), self.db_path.clone()),
            ]),
        })
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite status store");
        self.pool.close().await;
        Ok(())
    }
}
