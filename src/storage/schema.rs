//! Table layout and row conversions for the SQLite store
//!
//! Only the latest round is kept: `target_status` holds one row per target of
//! that round and `system_snapshot` holds a single row (`id = 1`). The
//! presence of the snapshot row is what marks a round as published.
//!
//! Timestamps are stored as RFC 3339 text with nanosecond precision so values
//! read back compare equal to what was published.

use chrono::{DateTime, SecondsFormat, Utc};

use super::error::{StorageError, StorageResult};
use crate::{SystemStatusSnapshot, Target, TargetStatus};

pub const SCHEMA: [&str; 2] = [
    r#"
    CREATE TABLE IF NOT EXISTS target_status (
        host TEXT NOT NULL,
        port INTEGER NOT NULL,
        position INTEGER NOT NULL,
        status TEXT NOT NULL,
        cpu_percent REAL NOT NULL,
        ram_megabytes REAL NOT NULL,
        last_checked TEXT NOT NULL,
        PRIMARY KEY (host, port)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS system_snapshot (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        cpu_average REAL NOT NULL,
        ram_average REAL NOT NULL,
        ram_total REAL NOT NULL,
        uptime_seconds INTEGER NOT NULL,
        last_updated TEXT NOT NULL
    )
    "#,
];

/// One stored `target_status` row
#[derive(Debug, Clone, PartialEq)]
pub struct StatusRow {
    pub host: String,
    pub port: i64,
    pub position: i64,
    pub status: String,
    pub cpu_percent: f64,
    pub ram_megabytes: f64,
    pub last_checked: String,
}

/// The stored `system_snapshot` row
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    pub cpu_average: f64,
    pub ram_average: f64,
    pub ram_total: f64,
    pub uptime_seconds: i64,
    pub last_updated: String,
}

pub fn timestamp_to_text(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn text_to_timestamp(text: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::CorruptRecord(format!("bad timestamp '{text}': {e}")))
}

impl StatusRow {
    pub fn from_status(position: usize, status: &TargetStatus) -> Self {
        Self {
            host: status.target.host.clone(),
            port: i64::from(status.target.port),
            position: position as i64,
            status: status.status.to_string(),
            cpu_percent: status.cpu_percent,
            ram_megabytes: status.ram_megabytes,
            last_checked: timestamp_to_text(&status.last_checked),
        }
    }

    pub fn into_status(self) -> StorageResult<TargetStatus> {
        let port = u16::try_from(self.port)
            .map_err(|_| StorageError::CorruptRecord(format!("bad port {}", self.port)))?;
        let status = self.status.parse().map_err(StorageError::CorruptRecord)?;

        Ok(TargetStatus {
            target: Target::new(self.host, port),
            status,
            cpu_percent: self.cpu_percent,
            ram_megabytes: self.ram_megabytes,
            last_checked: text_to_timestamp(&self.last_checked)?,
        })
    }
}

impl SnapshotRow {
    pub fn from_snapshot(snapshot: &SystemStatusSnapshot) -> Self {
        Self {
            cpu_average: snapshot.cpu_average,
            ram_average: snapshot.ram_average,
            ram_total: snapshot.ram_total,
            uptime_seconds: i64::try_from(snapshot.uptime_seconds).unwrap_or(i64::MAX),
            last_updated: timestamp_to_text(&snapshot.last_updated),
        }
    }

    pub fn into_snapshot(self) -> StorageResult<SystemStatusSnapshot> {
        let uptime_seconds = u64::try_from(self.uptime_seconds).map_err(|_| {
            StorageError::CorruptRecord(format!("negative uptime {}", self.uptime_seconds))
        })?;

        Ok(SystemStatusSnapshot {
            cpu_average: self.cpu_average,
            ram_average: self.ram_average,
            ram_total: self.ram_total,
            uptime_seconds,
            last_updated: text_to_timestamp(&self.last_updated)?,
        })
    }
}
