//! Helper functions for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use fleet_monitor::Target;
use fleet_monitor::actors::fleet::FleetHandle;
use fleet_monitor::config::MonitorSettings;
use fleet_monitor::monitors::metrics::FixedMetrics;
use fleet_monitor::monitors::probe::{ProbeResult, Prober};
use fleet_monitor::storage::StatusStore;
use tokio::net::TcpListener;

/// Settings that never tick on their own within a test
pub fn create_test_settings(targets: Vec<Target>, timeout: Duration) -> MonitorSettings {
    MonitorSettings {
        targets,
        probe_timeout: timeout,
        poll_interval: Duration::from_secs(3600),
        warning_cpu_threshold: 75.0,
    }
}

/// Answers "up" after a fixed delay
pub struct DelayProber {
    pub delay: Duration,
}

#[async_trait]
impl Prober for DelayProber {
    async fn probe(&self, target: &Target, _timeout: Duration) -> ProbeResult {
        let probed_at = Utc::now();
        tokio::time::sleep(self.delay).await;
        ProbeResult::up(target.clone(), probed_at, self.delay)
    }
}

/// Bind a listener on an ephemeral localhost port and keep accepting
pub async fn open_port() -> (u16, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let task = tokio::spawn(async move {
        loop {
            if listener.accept().await.is_err() {
                break;
            }
        }
    });
    (port, task)
}

/// A localhost port with nothing listening on it
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

pub fn local_target(port: u16) -> Target {
    Target::new("127.0.0.1", port)
}

pub fn spawn_fleet(
    settings: MonitorSettings,
    prober: Arc<dyn Prober>,
    store: Arc<dyn StatusStore>,
) -> FleetHandle {
    FleetHandle::spawn(
        settings,
        prober,
        Arc::new(FixedMetrics::new(20.0, 256.0)),
        store,
    )
}

/// Shut the monitor down and wait until its loop has exited
///
/// Commands queue behind the shutdown, so the follow-up poll only
/// resolves once the actor is gone.
pub async fn stop_fleet(handle: FleetHandle) {
    handle.shutdown().await.unwrap();
    assert!(handle.poll_now().await.is_err());
}
