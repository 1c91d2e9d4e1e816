//! Resource-usage sources attached to every probed target
//!
//! The fleet monitor only sees the [`MetricsSource`] trait, so the random
//! stand-in can be replaced by real telemetry without touching it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use rand::Rng;
use sysinfo::{MINIMUM_CPU_UPDATE_INTERVAL, System};
use tracing::debug;

use crate::Target;
use crate::config::{MetricsConfig, MetricsSourceKind};

const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

/// Load figures for a single target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetSample {
    pub cpu_percent: f64,
    pub ram_megabytes: f64,
}

/// System-wide figures that are not derived from the per-target batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemSample {
    pub ram_total: f64,
}

/// Point-in-time resource readings
///
/// Implementations must never block on network I/O.
pub trait MetricsSource: Send + Sync {
    fn sample(&self, target: &Target) -> TargetSample;

    fn sample_system(&self) -> SystemSample;
}

/// Build the configured metrics source
pub fn from_config(config: &MetricsConfig) -> Arc<dyn MetricsSource> {
    match config.source {
        MetricsSourceKind::Random => {
            debug!("using random metrics source");
            Arc::new(RandomMetrics::new(
                config.target_ram_capacity_mb as f64,
                config.system_ram_total_mb as f64,
            ))
        }
        MetricsSourceKind::System => {
            debug!("using sysinfo metrics source");
            Arc::new(SysinfoMetrics::new())
        }
    }
}

/// Uniform random whole numbers: CPU in `[0, 100)`, RAM in `[0, capacity)`
#[derive(Debug, Clone)]
pub struct RandomMetrics {
    target_ram_capacity: f64,
    system_ram_total: f64,
}

impl RandomMetrics {
    pub fn new(target_ram_capacity: f64, system_ram_total: f64) -> Self {
        Self {
            target_ram_capacity,
            system_ram_total,
        }
    }
}

impl Default for RandomMetrics {
    fn default() -> Self {
        Self::new(1024.0, 8192.0)
    }
}

impl MetricsSource for RandomMetrics {
    fn sample(&self, _target: &Target) -> TargetSample {
        let mut rng = rand::thread_rng();
        TargetSample {
            cpu_percent: rng.gen_range(0.0..100.0_f64).floor(),
            ram_megabytes: rng.gen_range(0.0..self.target_ram_capacity).floor(),
        }
    }

    fn sample_system(&self) -> SystemSample {
        SystemSample {
            ram_total: self.system_ram_total,
        }
    }
}

/// Host-wide CPU and memory read through sysinfo
///
/// Ports cannot be attributed to processes portably, so every target reports
/// the host figures. CPU usage is a delta between two refreshes, so it is
/// re-read at most once per [`sysinfo::MINIMUM_CPU_UPDATE_INTERVAL`] and the
/// cached reading is shared by every target sampled in between.
pub struct SysinfoMetrics {
    host: Mutex<HostReading>,
}

struct HostReading {
    system: System,
    cpu_percent: f64,
    cpu_read_at: Instant,
}

impl SysinfoMetrics {
    /// Blocks for one CPU update interval to take the first reading.
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
        system.refresh_cpu_usage();
        system.refresh_memory();

        let cpu_percent = cap_cpu_percent(f64::from(system.global_cpu_usage()));
        Self {
            host: Mutex::new(HostReading {
                system,
                cpu_percent,
                cpu_read_at: Instant::now(),
            }),
        }
    }
}

impl Default for SysinfoMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSource for SysinfoMetrics {
    fn sample(&self, _target: &Target) -> TargetSample {
        let mut host = self.host.lock().unwrap_or_else(|e| e.into_inner());

        if host.cpu_read_at.elapsed() >= MINIMUM_CPU_UPDATE_INTERVAL {
            host.system.refresh_cpu_usage();
            host.cpu_percent = cap_cpu_percent(f64::from(host.system.global_cpu_usage()));
            host.cpu_read_at = Instant::now();
        }
        host.system.refresh_memory();

        TargetSample {
            cpu_percent: host.cpu_percent,
            ram_megabytes: host.system.used_memory() as f64 / BYTES_PER_MEGABYTE,
        }
    }

    fn sample_system(&self) -> SystemSample {
        let mut host = self.host.lock().unwrap_or_else(|e| e.into_inner());
        host.system.refresh_memory();

        SystemSample {
            ram_total: host.system.total_memory() as f64 / BYTES_PER_MEGABYTE,
        }
    }
}

/// Largest value below 100
const MAX_CPU_PERCENT: f64 = f64::from_bits(100.0_f64.to_bits() - 1);

/// Keep a reading inside `[0, 100)`
fn cap_cpu_percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, MAX_CPU_PERCENT)
}

/// Deterministic figures, optionally overridden per target
#[derive(Debug, Clone)]
pub struct FixedMetrics {
    default: TargetSample,
    overrides: HashMap<Target, TargetSample>,
    ram_total: f64,
}

impl FixedMetrics {
    pub fn new(cpu_percent: f64, ram_megabytes: f64) -> Self {
        Self {
            default: TargetSample {
                cpu_percent,
                ram_megabytes,
            },
            overrides: HashMap::new(),
            ram_total: 8192.0,
        }
    }

    pub fn with_target(mut self, target: Target, cpu_percent: f64, ram_megabytes: f64) -> Self {
        self.overrides.insert(
            target,
            TargetSample {
                cpu_percent,
                ram_megabytes,
            },
        );
        self
    }

    pub fn with_ram_total(mut self, ram_total: f64) -> Self {
        self.ram_total = ram_total;
        self
    }
}

impl MetricsSource for FixedMetrics {
    fn sample(&self, target: &Target) -> TargetSample {
        self.overrides
            .get(target)
            .copied()
            .unwrap_or(self.default)
    }

    fn sample_system(&self) -> SystemSample {
        SystemSample {
            ram_total: self.ram_total,
        }
    }
}
