//! Port probing
//!
//! A probe performs one bounded-time liveness check against a single target.
//! Unreachability is an expected outcome and is reported through
//! [`ProbeResult::failure_reason`], never as an error.
//!
//! Two probers are provided:
//!
//! - [`TcpProber`]: connection establishment only
//! - [`HttpProber`]: connection followed by `GET /`; any HTTP response means the target is up

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tracing::trace;

use crate::Target;

/// Why a target was judged unreachable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// No answer before the deadline
    Timeout,
    /// Nothing is listening on the port
    Refused,
    /// Connection reset or aborted by the peer
    Reset,
    /// Host name could not be resolved
    Dns,
    /// Connection established but the HTTP exchange failed
    Http,
    /// Any other I/O failure
    Other,
}

impl FailureReason {
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => FailureReason::Refused,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => FailureReason::Reset,
            io::ErrorKind::TimedOut => FailureReason::Timeout,
            _ => FailureReason::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Timeout => "timeout",
            FailureReason::Refused => "refused",
            FailureReason::Reset => "reset",
            FailureReason::Dns => "dns",
            FailureReason::Http => "http",
            FailureReason::Other => "other",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one liveness check. Superseded by the next round's result.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub target: Target,
    pub reachable: bool,
    pub probed_at: DateTime<Utc>,
    pub latency: Duration,
    pub failure_reason: Option<FailureReason>,
}

impl ProbeResult {
    pub fn up(target: Target, probed_at: DateTime<Utc>, latency: Duration) -> Self {
        Self {
            target,
            reachable: true,
            probed_at,
            latency,
            failure_reason: None,
        }
    }

    pub fn down(
        target: Target,
        probed_at: DateTime<Utc>,
        latency: Duration,
        reason: FailureReason,
    ) -> Self {
        Self {
            target,
            reachable: false,
            probed_at,
            latency,
            failure_reason: Some(reason),
        }
    }

    pub fn timed_out(target: Target, probed_at: DateTime<Utc>, timeout: Duration) -> Self {
        Self::down(target, probed_at, timeout, FailureReason::Timeout)
    }
}

/// A single bounded-time liveness check
///
/// Implementations must resolve within `timeout` and release every socket
/// they open on all exit paths.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult;
}

/// Every address the target's host name resolves to
async fn resolve(target: &Target) -> Result<Vec<SocketAddr>, FailureReason> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((target.host.as_str(), target.port))
        .await
        .map_err(|_| FailureReason::Dns)?
        .collect();

    if addrs.is_empty() {
        return Err(FailureReason::Dns);
    }
    Ok(addrs)
}

/// Resolve the target and connect to the first address that accepts
async fn connect(target: &Target) -> Result<TcpStream, FailureReason> {
    let addrs = resolve(target).await?;

    let mut last_failure = FailureReason::Other;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                trace!("connect to {addr} failed: {e}");
                last_failure = FailureReason::from_io(&e);
            }
        }
    }

    Err(last_failure)
}

/// Probes by establishing a TCP connection and closing it immediately
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

impl TcpProber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult {
        let probed_at = Utc::now();
        let start = Instant::now();

        // The stream is dropped on every path, including when the timeout
        // cancels an in-flight connect.
        let outcome = tokio::time::timeout(timeout, connect(target)).await;
        let latency = start.elapsed();

        match outcome {
            Ok(Ok(_stream)) => ProbeResult::up(target.clone(), probed_at, latency),
            Ok(Err(reason)) => ProbeResult::down(target.clone(), probed_at, latency, reason),
            Err(_) => ProbeResult::timed_out(target.clone(), probed_at, timeout),
        }
    }
}

/// Probes with `GET http://host:port/`
///
/// Any HTTP response, whatever its status code, means the target is up.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self { client })
    }

    fn classify_error(err: &reqwest::Error) -> FailureReason {
        if err.is_timeout() {
            return FailureReason::Timeout;
        }

        let mut source = std::error::Error::source(err);
        while let Some(inner) = source {
            if let Some(io_err) = inner.downcast_ref::<io::Error>() {
                return FailureReason::from_io(io_err);
            }
            source = inner.source();
        }

        if err.is_connect() {
            FailureReason::Other
        } else {
            FailureReason::Http
        }
    }

    async fn request(&self, target: &Target, timeout: Duration) -> Result<String, FailureReason> {
        // Name failures come from our own lookup, not the client's error chain.
        resolve(target).await?;

        let url = format!("http://{}:{}/", target.host, target.port);
        match self.client.get(&url).timeout(timeout).send().await {
            Ok(response) => Ok(format!("{url}: answered with {}", response.status())),
            Err(e) => {
                let reason = Self::classify_error(&e);
                trace!("{url}: request failed ({reason}): {e}");
                Err(reason)
            }
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult {
        let probed_at = Utc::now();
        let start = Instant::now();

        let outcome = tokio::time::timeout(timeout, self.request(target, timeout)).await;
        let latency = start.elapsed();

        match outcome {
            Ok(Ok(answer)) => {
                trace!("{answer}");
                ProbeResult::up(target.clone(), probed_at, latency)
            }
            Ok(Err(reason)) => ProbeResult::down(target.clone(), probed_at, latency, reason),
            Err(_) => ProbeResult::timed_out(target.clone(), probed_at, timeout),
        }
    }
}
