//! Building blocks of a probing round
//!
//! - [`probe`]: bounded-time liveness checks
//! - [`metrics`]: pluggable resource-usage sources
//! - [`status`]: classification and snapshot aggregation

pub mod metrics;
pub mod probe;
pub mod status;

pub use metrics::{MetricsSource, SystemSample, TargetSample};
pub use probe::{FailureReason, ProbeResult, Prober};
