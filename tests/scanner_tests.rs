use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use portcheck_rs::probe::Prober;
use portcheck_rs::scanner::run;
use portcheck_rs::tasks::make_tasks;
use portcheck_rs::types::{ProbeOutcome, ProbeResult, Protocol, ProtocolSelector, Task};

/// Stub prober that records how many probes of each protocol overlap.
#[derive(Default)]
struct CountingProber {
    delay: Duration,
    active_tcp: AtomicUsize,
    max_tcp: AtomicUsize,
    active_udp: AtomicUsize,
    max_udp: AtomicUsize,
    active_all: AtomicUsize,
    max_all: AtomicUsize,
}

impl CountingProber {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Prober for CountingProber {
    async fn probe(&self, task: &Task) -> ProbeResult {
        let (active, max) = match task.protocol {
            Protocol::Tcp => (&self.active_tcp, &self.max_tcp),
            Protocol::Udp => (&self.active_udp, &self.max_udp),
        };
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        let all = self.active_all.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_all.fetch_max(all, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.active_all.fetch_sub(1, Ordering::SeqCst);
        active.fetch_sub(1, Ordering::SeqCst);
        ProbeResult {
            source: "unknown".into(),
            destination: task.host.clone(),
            port: task.port,
            protocol: task.protocol,
            outcome: match task.protocol {
                Protocol::Tcp => ProbeOutcome::Closed,
                Protocol::Udp => ProbeOutcome::NoResponse,
            },
            elapsed_secs: self.delay.as_secs_f64(),
        }
    }
}

fn hosts(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("10.0.0.{i}")).collect()
}

fn multiset<'a>(keys: impl Iterator<Item = (&'a str, u16, Protocol)>) -> HashMap<(String, u16, Protocol), usize> {
    let mut m = HashMap::new();
    for (h, p, proto) in keys {
        *m.entry((h.to_string(), p, proto)).or_insert(0) += 1;
    }
    m
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn both_protocols_yield_one_record_per_task() {
    let hosts = hosts(3);
    let ports = [22u16, 53, 80, 443, 8080];
    let tasks = make_tasks(&hosts, &ports, ProtocolSelector::Both);
    let expected = multiset(tasks.iter().map(|t| (t.host.as_str(), t.port, t.protocol)));

    let prober = Arc::new(CountingProber::with_delay(Duration::from_millis(2)));
    let results = run(tasks, prober, 7, 3).await;

    assert_eq!(results.len(), 2 * 3 * 5);
    let got = multiset(
        results
            .iter()
            .map(|r| (r.destination.as_str(), r.port, r.protocol)),
    );
    assert_eq!(got, expected);
    assert!(got.values().all(|&n| n == 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrency_limits_are_respected() {
    let hosts = hosts(4);
    let ports: Vec<u16> = (1000..1010).collect();
    let tasks = make_tasks(&hosts, &ports, ProtocolSelector::Both);
    let total = tasks.len();

    let prober = Arc::new(CountingProber::with_delay(Duration::from_millis(10)));
    let results = run(tasks, prober.clone(), 6, 2).await;

    assert_eq!(results.len(), total);
    let max_all = prober.max_all.load(Ordering::SeqCst);
    let max_tcp = prober.max_tcp.load(Ordering::SeqCst);
    let max_udp = prober.max_udp.load(Ordering::SeqCst);
    assert!(max_all <= 6, "{max_all} probes in flight, limit 6");
    assert!(max_tcp <= 6, "{max_tcp} tcp probes in flight, limit 6");
    assert!(max_udp <= 2, "{max_udp} udp probes in flight, limit 2");
    assert!(max_tcp >= 1 && max_udp >= 1);
}

#[tokio::test]
async fn workers_clamped_to_task_count() {
    let tasks = make_tasks(&hosts(1), &[1, 2, 3], ProtocolSelector::Tcp);
    let prober = Arc::new(CountingProber::default());
    let results = run(tasks, prober.clone(), 10_000, 100).await;
    assert_eq!(results.len(), 3);
    assert!(prober.max_all.load(Ordering::SeqCst) <= 3);
}

#[tokio::test]
async fn empty_task_list_returns_nothing() {
    let prober = Arc::new(CountingProber::default());
    let results = run(Vec::new(), prober, 200, 100).await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn single_worker_processes_everything_sequentially() {
    let tasks = make_tasks(&hosts(2), &[7, 9], ProtocolSelector::Both);
    let prober = Arc::new(CountingProber::with_delay(Duration::from_millis(1)));
    let results = run(tasks, prober.clone(), 1, 1).await;
    assert_eq!(results.len(), 8);
    assert_eq!(prober.max_all.load(Ordering::SeqCst), 1);
}
