//! Integration tests for the SQLite status store
//!
//! The database mirrors the running hub's latest round. A round written
//! by an earlier run is never served as current.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fleet_monitor::config::{StorageConfig, parse_config};
use fleet_monitor::monitors::probe::TcpProber;
use fleet_monitor::storage::sqlite::SqliteStore;
use fleet_monitor::storage::{StatusStore, open_store};
use fleet_monitor::{SystemStatusSnapshot, Target, TargetState, TargetStatus};
use tempfile::tempdir;

use crate::helpers::*;

#[tokio::test]
async fn test_restart_hides_previous_round() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("fleet.db");

    {
        let store = SqliteStore::new(&db_path).await.unwrap();
        store
            .publish(
                vec![TargetStatus {
                    target: Target::localhost(9999),
                    status: TargetState::Online,
                    cpu_percent: 10.0,
                    ram_megabytes: 64.0,
                    last_checked: Utc::now(),
                }],
                SystemStatusSnapshot {
                    cpu_average: 10.0,
                    ram_average: 64.0,
                    ram_total: 8192.0,
                    uptime_seconds: 86400,
                    last_updated: Utc::now(),
                },
            )
            .await
            .unwrap();
        store.close().await.unwrap();
    }

    let store = Arc::new(SqliteStore::new(&db_path).await.unwrap());
    let handle = spawn_fleet(
        create_test_settings(vec![Target::localhost(5000)], Duration::from_secs(2)),
        Arc::new(DelayProber {
            delay: Duration::from_millis(500),
        }),
        store.clone(),
    );

    // The new hub has not finished a round yet
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(store.get_all().await.unwrap(), None);
    assert_eq!(store.get_snapshot().await.unwrap(), None);

    handle.poll_now().await.unwrap();
    stop_fleet(handle).await;

    let round = store.latest().await.unwrap().unwrap();
    assert_eq!(round.statuses.len(), 1);
    assert_eq!(round.statuses[0].target.port, 5000);
    assert!(round.snapshot.uptime_seconds < 86400);

    store.close().await.unwrap();
}

#[tokio::test]
async fn test_published_round_reaches_the_file() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("fleet.db");

    let (open, _listener) = open_port().await;
    let closed = closed_port().await;

    let store = Arc::new(SqliteStore::new(&db_path).await.unwrap());
    let handle = spawn_fleet(
        create_test_settings(
            vec![local_target(open), local_target(closed)],
            Duration::from_millis(500),
        ),
        Arc::new(TcpProber::new()),
        store.clone(),
    );

    handle.poll_now().await.unwrap();
    stop_fleet(handle).await;

    let round = store.latest().await.unwrap().unwrap();
    assert_eq!(round.statuses.len(), 2);
    assert_eq!(round.statuses[0].target.port, open);
    assert_eq!(round.statuses[0].status, TargetState::Online);
    assert_eq!(round.statuses[1].target.port, closed);
    assert_eq!(round.statuses[1].status, TargetState::Offline);
    store.close().await.unwrap();

    // Another reader of the same file sees the rows the hub wrote
    let pool = sqlx::SqlitePool::connect(&format!("sqlite://{}", db_path.display()))
        .await
        .unwrap();
    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM target_status")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 2);
    pool.close().await;
}

#[tokio::test]
async fn test_open_store_from_config() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("configured.db");

    let config = parse_config(&format!(
        r#"{{ "storage": {{ "backend": "sqlite", "path": {:?} }} }}"#,
        db_path.to_string_lossy()
    ))
    .unwrap();
    let resolved = config.resolve().unwrap();
    assert!(matches!(resolved.storage, StorageConfig::Sqlite { .. }));

    let store = open_store(&resolved.storage).await.unwrap();
    assert!(store.health_check().await.unwrap().healthy);
    assert!(store.get_all().await.unwrap().is_none());

    let handle = spawn_fleet(
        create_test_settings(vec![], Duration::from_millis(100)),
        Arc::new(TcpProber::new()),
        store.clone(),
    );
    handle.poll_now().await.unwrap();
    stop_fleet(handle).await;

    assert_eq!(store.get_all().await.unwrap(), Some(vec![]));
    store.close().await.unwrap();
    assert!(db_path.exists());
}

#[tokio::test]
async fn test_smaller_round_drops_stale_rows() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("shrink.db");
    let store = Arc::new(SqliteStore::new(&db_path).await.unwrap());

    let ports = [closed_port().await, closed_port().await, closed_port().await];

    let handle = spawn_fleet(
        create_test_settings(
            ports.iter().copied().map(local_target).collect(),
            Duration::from_millis(300),
        ),
        Arc::new(TcpProber::new()),
        store.clone(),
    );
    handle.poll_now().await.unwrap();
    stop_fleet(handle).await;
    assert_eq!(store.get_all().await.unwrap().unwrap().len(), 3);

    let handle = spawn_fleet(
        create_test_settings(vec![local_target(ports[0])], Duration::from_millis(300)),
        Arc::new(TcpProber::new()),
        store.clone(),
    );
    handle.poll_now().await.unwrap();
    stop_fleet(handle).await;

    let all = store.get_all().await.unwrap().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].target.port, ports[0]);

    store.close().await.unwrap();
}
