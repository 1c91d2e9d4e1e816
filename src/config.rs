use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use tracing::trace;

use crate::Target;

/// Ports monitored when no target list is configured
pub const DEFAULT_PORTS: std::ops::RangeInclusive<u16> = 5000..=5009;

/// Storage backend configuration
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory store (latest round only, no persistence)
    #[serde(rename = "none")]
    None,

    /// SQLite database holding the latest published round
    Sqlite {
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::None
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./fleet-status.db")
}

/// How a target is probed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    /// TCP connection establishment only
    #[default]
    Tcp,
    /// TCP connection followed by `GET /`; any HTTP response counts as reachable
    Http,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub mode: ProbeMode,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            mode: ProbeMode::default(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    1000
}

/// Which metrics synthesizer feeds the monitor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsSourceKind {
    /// Uniform random stand-in values
    #[default]
    Random,
    /// Host CPU and memory read through sysinfo
    System,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub source: MetricsSourceKind,
    /// Upper bound for synthesized per-target RAM usage
    #[serde(default = "default_target_ram_capacity_mb")]
    pub target_ram_capacity_mb: u64,
    /// Reported system RAM total for the random source
    #[serde(default = "default_system_ram_total_mb")]
    pub system_ram_total_mb: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            source: MetricsSourceKind::default(),
            target_ram_capacity_mb: default_target_ram_capacity_mb(),
            system_ram_total_mb: default_system_ram_total_mb(),
        }
    }
}

fn default_target_ram_capacity_mb() -> u64 {
    1024
}

fn default_system_ram_total_mb() -> u64 {
    8192
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct ApiSettings {
    #[serde(default = "crate::util::get_default_api_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bind_addr: crate::util::get_default_api_addr(),
            enable_cors: default_enable_cors(),
        }
    }
}

fn default_enable_cors() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    5
}

fn default_warning_threshold() -> f64 {
    crate::monitors::status::DEFAULT_WARNING_CPU_THRESHOLD
}

/// Raw configuration as read from disk. Every field is optional.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    pub targets: Option<Vec<Target>>,
    pub probe: Option<ProbeConfig>,
    pub poll_interval_secs: Option<u64>,
    pub warning_cpu_threshold: Option<f64>,
    pub metrics: Option<MetricsConfig>,
    pub storage: Option<StorageConfig>,
    pub api: Option<ApiSettings>,
}

/// Settings consumed by the fleet monitor
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub targets: Vec<Target>,
    pub probe_timeout: Duration,
    pub poll_interval: Duration,
    pub warning_cpu_threshold: f64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            targets: default_targets(),
            probe_timeout: Duration::from_millis(default_timeout_ms()),
            poll_interval: Duration::from_secs(default_interval_secs()),
            warning_cpu_threshold: default_warning_threshold(),
        }
    }
}

/// Validated configuration with all defaults applied
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub monitor: MonitorSettings,
    pub probe_mode: ProbeMode,
    pub metrics: MetricsConfig,
    pub storage: StorageConfig,
    pub api: ApiSettings,
}

pub fn default_targets() -> Vec<Target> {
    DEFAULT_PORTS.map(Target::localhost).collect()
}

/// Fatal configuration problems, reported at startup
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidTarget(String),
    InvalidTimeout,
    InvalidInterval,
    InvalidThreshold(f64),
    InvalidMetrics(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidTarget(msg) => write!(f, "invalid target list: {msg}"),
            ConfigError::InvalidTimeout => write!(f, "probe timeout must be positive"),
            ConfigError::InvalidInterval => write!(f, "poll interval must be positive"),
            ConfigError::InvalidThreshold(value) => {
                write!(f, "warning cpu threshold {value} is outside 0..=100")
            }
            ConfigError::InvalidMetrics(msg) => write!(f, "invalid metrics configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Apply defaults and validate
    pub fn resolve(self) -> Result<ResolvedConfig, ConfigError> {
        let targets = self.targets.unwrap_or_else(default_targets);
        validate_targets(&targets)?;

        let probe = self.probe.unwrap_or_default();
        if probe.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        let interval_secs = self.poll_interval_secs.unwrap_or_else(default_interval_secs);
        if interval_secs == 0 {
            return Err(ConfigError::InvalidInterval);
        }

        let threshold = self
            .warning_cpu_threshold
            .unwrap_or_else(default_warning_threshold);
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ConfigError::InvalidThreshold(threshold));
        }

        let metrics = self.metrics.unwrap_or_default();
        if metrics.target_ram_capacity_mb == 0 {
            return Err(ConfigError::InvalidMetrics(
                "target_ram_capacity_mb must be positive".to_string(),
            ));
        }
        if metrics.system_ram_total_mb == 0 {
            return Err(ConfigError::InvalidMetrics(
                "system_ram_total_mb must be positive".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            monitor: MonitorSettings {
                targets,
                probe_timeout: Duration::from_millis(probe.timeout_ms),
                poll_interval: Duration::from_secs(interval_secs),
                warning_cpu_threshold: threshold,
            },
            probe_mode: probe.mode,
            metrics,
            storage: self.storage.unwrap_or_default(),
            api: self.api.unwrap_or_default(),
        })
    }
}

fn validate_targets(targets: &[Target]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for target in targets {
        if target.host.trim().is_empty() {
            return Err(ConfigError::InvalidTarget(format!(
                "empty host for port {}",
                target.port
            )));
        }
        if target.port == 0 {
            return Err(ConfigError::InvalidTarget(format!(
                "port 0 on host {}",
                target.host
            )));
        }
        if !seen.insert(target) {
            return Err(ConfigError::InvalidTarget(format!("duplicate target {target}")));
        }
    }
    Ok(())
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    parse_config(&file_content).inspect(|config| trace!("loaded config: {config:?}"))
}

pub fn parse_config(content: &str) -> anyhow::Result<Config> {
    serde_json::from_str(content).context("invalid configuration file provided")
}
