pub mod actors;
pub mod api;
pub mod config;
pub mod monitors;
pub mod storage;
pub mod util;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A monitored endpoint. Identity is the `(host, port)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Target {
    #[serde(default = "crate::util::get_default_host")]
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn localhost(port: u16) -> Self {
        Self::new(crate::util::get_default_host(), port)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Liveness classification of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetState {
    Online,
    Offline,
    /// Reachable but under heavy load
    Warning,
    /// Reserved for externally signaled maintenance. Never derived from probe data.
    Restarting,
}

impl TargetState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetState::Online => "online",
            TargetState::Offline => "offline",
            TargetState::Warning => "warning",
            TargetState::Restarting => "restarting",
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TargetState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(TargetState::Online),
            "offline" => Ok(TargetState::Offline),
            "warning" => Ok(TargetState::Warning),
            "restarting" => Ok(TargetState::Restarting),
            other => Err(format!("unknown target state: {other}")),
        }
    }
}

/// Per-target record exposed to consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetStatus {
    #[serde(flatten)]
    pub target: Target,
    pub status: TargetState,
    pub cpu_percent: f64,
    pub ram_megabytes: f64,
    pub last_checked: DateTime<Utc>,
}

/// Aggregated system-wide status for one round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatusSnapshot {
    pub cpu_average: f64,
    pub ram_average: f64,
    pub ram_total: f64,
    pub uptime_seconds: u64,
    pub last_updated: DateTime<Utc>,
}
