use chrono::{DateTime, Utc};

use crate::monitors::metrics::{SystemSample, TargetSample};
use crate::monitors::probe::ProbeResult;
use crate::{SystemStatusSnapshot, TargetState, TargetStatus};

/// Default CPU percentage above which a reachable target is flagged
pub const DEFAULT_WARNING_CPU_THRESHOLD: f64 = 75.0;

/// Liveness has priority: an unreachable target is offline whatever its load.
pub fn classify(reachable: bool, cpu_percent: f64, warning_threshold: f64) -> TargetState {
    if !reachable {
        return TargetState::Offline;
    }

    if cpu_percent > warning_threshold {
        TargetState::Warning
    } else {
        TargetState::Online
    }
}

pub fn target_status(
    probe: &ProbeResult,
    sample: TargetSample,
    warning_threshold: f64,
) -> TargetStatus {
    TargetStatus {
        target: probe.target.clone(),
        status: classify(probe.reachable, sample.cpu_percent, warning_threshold),
        cpu_percent: sample.cpu_percent,
        ram_megabytes: sample.ram_megabytes,
        last_checked: probe.probed_at,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Averages over the batch; an empty batch yields zero averages.
pub fn aggregate(
    batch: &[TargetStatus],
    system: SystemSample,
    uptime_seconds: u64,
    last_updated: DateTime<Utc>,
) -> SystemStatusSnapshot {
    SystemStatusSnapshot {
        cpu_average: mean(batch.iter().map(|s| s.cpu_percent)),
        ram_average: mean(batch.iter().map(|s| s.ram_megabytes)),
        ram_total: system.ram_total,
        uptime_seconds,
        last_updated,
    }
}
