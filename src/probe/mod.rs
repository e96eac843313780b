//! Protocol probers and the seam the executor dispatches through.
pub mod tcp;
pub mod udp;

use std::io;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::ScanConfig;
use crate::resolve::{source_address, UNKNOWN_SOURCE};
use crate::types::{ProbeOutcome, ProbeResult, Protocol, Task};

/// Per-probe parameters shared by every task of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    pub timeout: Duration,
    pub bind: Option<IpAddr>,
}

impl From<&ScanConfig> for ProbeSettings {
    fn from(cfg: &ScanConfig) -> Self {
        Self {
            timeout: cfg.timeout,
            bind: cfg.bind,
        }
    }
}

/// Performs the network interaction for one task.
///
/// Implementations must always return a record; failures belong in the outcome.
#[async_trait]
pub trait Prober: Send + Sync + 'static {
    async fn probe(&self, task: &Task) -> ProbeResult;
}

/// Real prober: TCP on the async runtime, UDP on the blocking pool.
#[derive(Debug, Clone)]
pub struct NetworkProber {
    settings: ProbeSettings,
}

impl NetworkProber {
    pub fn new(settings: ProbeSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Prober for NetworkProber {
    async fn probe(&self, task: &Task) -> ProbeResult {
        match task.protocol {
            Protocol::Tcp => tcp::probe(&task.host, task.port, &self.settings).await,
            Protocol::Udp => {
                let host = task.host.clone();
                let port = task.port;
                let settings = self.settings;
                // recv() blocks the thread for up to the timeout.
                match tokio::task::spawn_blocking(move || udp::probe(&host, port, &settings)).await {
                    Ok(result) => result,
                    Err(e) => ProbeResult::failed(
                        task,
                        UNKNOWN_SOURCE.to_string(),
                        task.host.clone(),
                        format!("udp probe aborted: {e}"),
                    ),
                }
            }
        }
    }
}

/// Record for a host that could not be resolved; nothing is dialed.
pub(crate) fn unresolved(
    host: &str,
    port: u16,
    protocol: Protocol,
    settings: &ProbeSettings,
    err: io::Error,
) -> ProbeResult {
    debug!(%host, %err, bind = ?settings.bind, "resolution failed, reporting raw host as destination");
    // No socket was opened, so no bind was applied.
    ProbeResult {
        source: source_address(None, None, None),
        destination: host.to_string(),
        port,
        protocol,
        outcome: ProbeOutcome::Error(format!("cannot resolve {host}: {err}")),
        elapsed_secs: 0.0,
    }
}

/// What a single connection attempt observed before the result is assembled.
pub(crate) struct Attempt {
    pub outcome: ProbeOutcome,
    pub endpoint: Option<IpAddr>,
    pub applied_bind: Option<IpAddr>,
}

impl Attempt {
    pub fn error(err: io::Error, applied_bind: Option<IpAddr>) -> Self {
        Self {
            outcome: ProbeOutcome::Error(err.to_string()),
            endpoint: None,
            applied_bind,
        }
    }
}
