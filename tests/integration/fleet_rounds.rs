//! End-to-end rounds against real sockets
//!
//! Probes go through the TCP prober to listeners opened by the test, so
//! the whole path from connect to published snapshot is exercised.

use std::sync::Arc;
use std::time::Duration;

use fleet_monitor::TargetState;
use fleet_monitor::actors::fleet::FleetHandle;
use fleet_monitor::monitors::metrics::FixedMetrics;
use fleet_monitor::monitors::probe::TcpProber;
use fleet_monitor::storage::{MemoryStore, StatusStore};

use crate::helpers::*;

#[tokio::test]
async fn test_open_and_closed_ports() {
    let (open, _listener) = open_port().await;
    let closed = closed_port().await;

    let store = Arc::new(MemoryStore::new());
    let metrics = FixedMetrics::new(30.0, 128.0).with_target(local_target(open), 90.0, 700.0);

    let handle = FleetHandle::spawn(
        create_test_settings(
            vec![local_target(open), local_target(closed)],
            Duration::from_millis(500),
        ),
        Arc::new(TcpProber::new()),
        Arc::new(metrics),
        store.clone(),
    );

    let summary = handle.poll_now().await.unwrap();
    assert_eq!(summary.targets, 2);
    assert_eq!(summary.warning, 1);
    assert_eq!(summary.offline, 1);

    let all = store.get_all().await.unwrap().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].target.port, open);
    assert_eq!(all[0].status, TargetState::Warning);
    assert_eq!(all[1].target.port, closed);
    assert_eq!(all[1].status, TargetState::Offline);
    // Offline targets still carry load figures
    assert_eq!(all[1].cpu_percent, 30.0);

    let snapshot = store.get_snapshot().await.unwrap().unwrap();
    assert!((snapshot.cpu_average - 60.0).abs() < 1e-9);
    assert!((snapshot.ram_average - 414.0).abs() < 1e-9);
    assert_eq!(snapshot.ram_total, 8192.0);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_state_follows_listener() {
    let (port, listener) = open_port().await;
    let store = Arc::new(MemoryStore::new());

    let handle = spawn_fleet(
        create_test_settings(vec![local_target(port)], Duration::from_millis(500)),
        Arc::new(TcpProber::new()),
        store.clone(),
    );

    let summary = handle.poll_now().await.unwrap();
    assert_eq!(summary.online, 1);

    listener.abort();
    let _ = listener.await;

    let summary = handle.poll_now().await.unwrap();
    assert_eq!(summary.offline, 1);

    let all = store.get_all().await.unwrap().unwrap();
    assert_eq!(all[0].status, TargetState::Offline);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_each_round_replaces_the_last() {
    let (port, _listener) = open_port().await;
    let store = Arc::new(MemoryStore::new());

    let handle = spawn_fleet(
        create_test_settings(vec![local_target(port)], Duration::from_millis(500)),
        Arc::new(TcpProber::new()),
        store.clone(),
    );

    let first = handle.poll_now().await.unwrap();
    let first_checked = store.get_all().await.unwrap().unwrap()[0].last_checked;

    let second = handle.poll_now().await.unwrap();
    assert!(second.round > first.round);

    let all = store.get_all().await.unwrap().unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].last_checked >= first_checked);

    let snapshot = store.get_snapshot().await.unwrap().unwrap();
    assert_eq!(snapshot.last_updated, second.completed_at);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_interval_drives_rounds() {
    let (port, _listener) = open_port().await;
    let store = Arc::new(MemoryStore::new());

    let mut settings = create_test_settings(vec![local_target(port)], Duration::from_millis(200));
    settings.poll_interval = Duration::from_millis(50);

    let handle = spawn_fleet(settings, Arc::new(TcpProber::new()), store.clone());

    tokio::time::sleep(Duration::from_millis(400)).await;

    // The scheduled rounds have published without any explicit poll
    let all = store.get_all().await.unwrap();
    assert!(all.is_some());

    let summary = handle.poll_now().await.unwrap();
    assert!(summary.round >= 3, "expected several scheduled rounds, got {}", summary.round);

    handle.shutdown().await.unwrap();
}
