use crate::config::ScanConfig;
use crate::probe::{NetworkProber, ProbeSettings, Prober};
use crate::tasks::make_tasks;
use crate::types::{ProbeResult, Protocol, ProtocolSelector, Task};
use anyhow::{bail, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Validate inputs, expand them into tasks and probe everything over the network.
///
/// Empty host or port lists are configuration errors and fail before any probe starts.
pub async fn run_checks(
    hosts: &[String],
    ports: &[u16],
    selector: ProtocolSelector,
    config: &ScanConfig,
) -> Result<Vec<ProbeResult>> {
    if hosts.is_empty() {
        bail!("no target hosts to probe");
    }
    if ports.is_empty() {
        bail!("no ports to probe");
    }
    let tasks = make_tasks(hosts, ports, selector);
    let prober = Arc::new(NetworkProber::new(ProbeSettings::from(config)));

    let started = Instant::now();
    let total = tasks.len();
    let results = run(tasks, prober, config.concurrency, config.udp_workers).await;

    let counts = summarize(&results);
    info!(
        total,
        elapsed = ?started.elapsed(),
        open = counts.get("open").copied().unwrap_or(0),
        closed = counts.get("closed").copied().unwrap_or(0),
        timeout = counts.get("timeout").copied().unwrap_or(0),
        no_response = counts.get("no-response").copied().unwrap_or(0),
        error = counts.get("error").copied().unwrap_or(0),
        "probe run finished"
    );
    Ok(results)
}

/// Probe every task exactly once with at most `concurrency` probes in flight.
///
/// `min(concurrency, tasks)` workers pull from a shared backlog until it is empty.
/// UDP probes additionally hold one of `udp_workers` slots while they run.
/// Results are in completion order.
pub async fn run<P: Prober>(
    tasks: Vec<Task>,
    prober: Arc<P>,
    concurrency: usize,
    udp_workers: usize,
) -> Vec<ProbeResult> {
    let total = tasks.len();
    let backlog = Arc::new(Backlog::new(tasks));
    let results = Arc::new(Mutex::new(Vec::with_capacity(total)));
    let udp_slots = Arc::new(Semaphore::new(udp_workers.max(1)));

    let workers = concurrency.max(1).min(total);
    debug!(tasks = total, workers, udp_workers, "starting probe workers");

    let mut set = JoinSet::new();
    for id in 0..workers {
        set.spawn(worker(
            id,
            backlog.clone(),
            prober.clone(),
            udp_slots.clone(),
            results.clone(),
        ));
    }
    while let Some(res) = set.join_next().await {
        if let Err(e) = res {
            warn!(error = %e, "probe worker terminated abnormally");
        }
    }

    let mut guard = results.lock().await;
    let out = std::mem::take(&mut *guard);
    if out.len() != total {
        warn!(expected = total, got = out.len(), "some tasks produced no result");
    }
    out
}

async fn worker<P: Prober>(
    id: usize,
    backlog: Arc<Backlog>,
    prober: Arc<P>,
    udp_slots: Arc<Semaphore>,
    results: Arc<Mutex<Vec<ProbeResult>>>,
) {
    while let Some(task) = backlog.claim() {
        let result = match task.protocol {
            Protocol::Tcp => prober.probe(task).await,
            Protocol::Udp => {
                // Never closed, so acquire only fails if the executor is torn down.
                let _slot = udp_slots.acquire().await.ok();
                prober.probe(task).await
            }
        };
        results.lock().await.push(result);
    }
    debug!(worker = id, "backlog empty, worker exiting");
}

/// Pending tasks shared by all workers. Claiming is a single atomic increment.
#[derive(Debug)]
pub struct Backlog {
    tasks: Vec<Task>,
    next: AtomicUsize,
}

impl Backlog {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            next: AtomicUsize::new(0),
        }
    }

    /// Take the next unclaimed task, or `None` once the backlog is exhausted.
    pub fn claim(&self) -> Option<&Task> {
        let idx = self.next.fetch_add(1, Ordering::Relaxed);
        self.tasks.get(idx)
    }
}

/// Count results per outcome label.
pub fn summarize(results: &[ProbeResult]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for r in results {
        *counts.entry(r.outcome.label()).or_insert(0) += 1;
    }
    counts
}
