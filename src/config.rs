use anyhow::{bail, Context, Result};
use std::net::IpAddr;
use std::time::Duration;
use tracing::warn;

use crate::interfaces;

pub const DEFAULT_CONCURRENCY: usize = 200;
pub const DEFAULT_UDP_WORKERS: usize = 100;
pub const DEFAULT_TIMEOUT_SECS: f64 = 3.0;

/// Validated run parameters consumed by the executor and probers.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Workers pulling from the backlog; bounds TCP probes in flight.
    pub concurrency: usize,
    /// Blocking slots for UDP probes, independent of `concurrency`.
    pub udp_workers: usize,
    pub timeout: Duration,
    pub bind: Option<IpAddr>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            udp_workers: DEFAULT_UDP_WORKERS,
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
            bind: None,
        }
    }
}

impl ScanConfig {
    /// Build a config from raw user input, rejecting values no run could use.
    ///
    /// A bind address that parses but is not present on any interface only logs a
    /// warning: each probe then falls back to the default route.
    pub fn new(
        concurrency: usize,
        udp_workers: usize,
        timeout_secs: f64,
        bind: Option<&str>,
    ) -> Result<Self> {
        if concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        if udp_workers == 0 {
            bail!("udp worker limit must be at least 1");
        }
        if !timeout_secs.is_finite() || timeout_secs <= 0.0 {
            bail!("timeout must be a positive number of seconds, got {timeout_secs}");
        }
        let Ok(timeout) = Duration::try_from_secs_f64(timeout_secs) else {
            bail!("timeout out of range: {timeout_secs}");
        };
        let bind = bind
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<IpAddr>()
                    .with_context(|| format!("bind address is not an IP address: {s}"))
            })
            .transpose()?;
        if let Some(ip) = bind {
            if interfaces::is_local_address(ip) == Some(false) {
                warn!(bind = %ip, "bind address is not assigned to any local interface; probes will use the default route");
            }
        }
        Ok(Self {
            concurrency,
            udp_workers,
            timeout,
            bind,
        })
    }
}
