//! FleetMonitorActor - Probes every target on a fixed interval
//!
//! One actor drives the whole fleet. Each tick runs a round: every target is
//! probed concurrently, load figures are attached, the batch is classified and
//! aggregated, and the result is published to the status store in one step.
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → probe all targets (concurrently) → classify → aggregate → StatusStore::publish
//!     ↑
//!     └─── Commands (PollNow, UpdateInterval, Shutdown)
//! ```
//!
//! Rounds run inside the actor loop, so they never overlap. Ticks missed
//! while a round is still running are skipped and commands queue up.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, instrument, warn};

use crate::config::MonitorSettings;
use crate::monitors::metrics::{MetricsSource, TargetSample};
use crate::monitors::probe::{FailureReason, ProbeResult, Prober};
use crate::monitors::status;
use crate::storage::StatusStore;
use crate::{Target, TargetState};

use super::messages::{FleetCommand, RoundSummary};

/// tokio intervals reject a zero period
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Actor that owns the probing schedule and is the only writer of the status store
pub struct FleetMonitorActor {
    settings: MonitorSettings,

    prober: Arc<dyn Prober>,

    metrics: Arc<dyn MetricsSource>,

    store: Arc<dyn StatusStore>,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<FleetCommand>,

    /// Process uptime is measured from here
    started: Instant,

    /// Number of rounds started so far
    rounds: u64,

    /// `lastUpdated` of the last published snapshot
    last_updated: Option<DateTime<Utc>>,

    interval_duration: Duration,
}

impl FleetMonitorActor {
    pub fn new(
        settings: MonitorSettings,
        prober: Arc<dyn Prober>,
        metrics: Arc<dyn MetricsSource>,
        store: Arc<dyn StatusStore>,
        command_rx: mpsc::Receiver<FleetCommand>,
    ) -> Self {
        let interval_duration = settings.poll_interval.max(MIN_POLL_INTERVAL);

        Self {
            settings,
            prober,
            metrics,
            store,
            command_rx,
            started: Instant::now(),
            rounds: 0,
            last_updated: None,
            interval_duration,
        }
    }

    fn ticker(&self) -> tokio::time::Interval {
        let mut ticker = interval(self.interval_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    }

    /// Run the actor's main loop
    ///
    /// Runs until a Shutdown command is received or every handle is dropped.
    #[instrument(skip(self), fields(targets = self.settings.targets.len()))]
    pub async fn run(mut self) {
        debug!("starting fleet monitor actor");

        let mut ticker = self.ticker();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_round().await {
                        error!("round failed: {:#}", e);
                    }
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(FleetCommand::PollNow { respond_to }) => {
                            debug!("received PollNow command");
                            let result = self.run_round().await;
                            let _ = respond_to.send(result);
                        }

                        Some(FleetCommand::UpdateInterval { interval }) => {
                            debug!("updating interval to {interval:?}");
                            self.interval_duration = interval.max(MIN_POLL_INTERVAL);
                            ticker = self.ticker();
                        }

                        Some(FleetCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }

                        None => {
                            warn!("all handles dropped, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        debug!("fleet monitor actor stopped");
    }

    /// Probe one target on its own task
    ///
    /// The result is forced to a timeout if the prober overruns its deadline,
    /// and to an offline result if the probe task panics.
    async fn probe_target(
        prober: Arc<dyn Prober>,
        metrics: Arc<dyn MetricsSource>,
        target: Target,
        timeout: Duration,
    ) -> (ProbeResult, TargetSample) {
        let probed_at = Utc::now();

        let task = {
            let target = target.clone();
            tokio::spawn(async move {
                match tokio::time::timeout(timeout, prober.probe(&target, timeout)).await {
                    Ok(result) => result,
                    Err(_) => ProbeResult::timed_out(target, probed_at, timeout),
                }
            })
        };

        let result = match task.await {
            Ok(result) => result,
            Err(e) => {
                error!(endpoint = %target, "probe task failed: {e}");
                ProbeResult::down(target, probed_at, Duration::ZERO, FailureReason::Other)
            }
        };

        if let Some(reason) = result.failure_reason {
            debug!(endpoint = %result.target, %reason, "probe failed");
        }

        // Load figures are produced whatever the outcome; classification gives liveness priority.
        let sample = metrics.sample(&result.target);

        (result, sample)
    }

    /// Run one complete round and publish it
    async fn run_round(&mut self) -> Result<RoundSummary> {
        self.rounds += 1;
        let round = self.rounds;

        let targets = self.settings.targets.clone();
        let timeout = self.settings.probe_timeout;
        let threshold = self.settings.warning_cpu_threshold;

        debug!(round, targets = targets.len(), "round started");
        let start = Instant::now();

        let outcomes = join_all(targets.iter().map(|target| {
            Self::probe_target(
                self.prober.clone(),
                self.metrics.clone(),
                target.clone(),
                timeout,
            )
        }))
        .await;

        let batch: Vec<_> = outcomes
            .iter()
            .map(|(result, sample)| status::target_status(result, *sample, threshold))
            .collect();

        let (online, warning, offline) = {
            let count = |state: TargetState| batch.iter().filter(|s| s.status == state).count();
            (
                count(TargetState::Online),
                count(TargetState::Warning),
                count(TargetState::Offline),
            )
        };

        let now = Utc::now();
        let completed_at = self.last_updated.map_or(now, |previous| previous.max(now));

        let snapshot = status::aggregate(
            &batch,
            self.metrics.sample_system(),
            self.started.elapsed().as_secs(),
            completed_at,
        );

        self.store
            .publish(batch, snapshot)
            .await
            .with_context(|| format!("failed to publish round {round}"))?;
        self.last_updated = Some(completed_at);

        let elapsed = start.elapsed();
        info!(
            round,
            online,
            warning,
            offline,
            elapsed_ms = elapsed.as_millis() as u64,
            "round complete"
        );

        if elapsed > self.interval_duration {
            warn!(
                round,
                "round took {elapsed:?}, longer than the {:?} poll interval; skipping missed ticks",
                self.interval_duration
            );
        }

        Ok(RoundSummary {
            round,
            targets: targets.len(),
            online,
            warning,
            offline,
            elapsed_ms: elapsed.as_millis() as u64,
            completed_at,
        })
    }
}

/// Handle for controlling a FleetMonitorActor
///
/// Cheap to clone and shareable across tasks.
#[derive(Clone)]
pub struct FleetHandle {
    sender: mpsc::Sender<FleetCommand>,

    targets: Arc<[Target]>,
}

impl FleetHandle {
    /// Spawn a new fleet monitor actor
    ///
    /// The first round starts immediately, later rounds follow the poll interval.
    pub fn spawn(
        settings: MonitorSettings,
        prober: Arc<dyn Prober>,
        metrics: Arc<dyn MetricsSource>,
        store: Arc<dyn StatusStore>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let targets: Arc<[Target]> = settings.targets.clone().into();

        let actor = FleetMonitorActor::new(settings, prober, metrics, store, cmd_rx);

        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            targets,
        }
    }

    /// Run a round now and wait for its summary
    pub async fn poll_now(&self) -> Result<RoundSummary> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(FleetCommand::PollNow { respond_to: tx })
            .await
            .context("failed to send PollNow command")?;

        rx.await.context("failed to receive round summary")?
    }

    /// Update the polling interval
    pub async fn update_interval(&self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            anyhow::bail!("poll interval must be positive");
        }

        self.sender
            .send(FleetCommand::UpdateInterval { interval })
            .await
            .context("failed to send UpdateInterval command")?;
        Ok(())
    }

    /// Gracefully shut down the monitor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(FleetCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }

    /// The fixed target set this monitor probes
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }
}
