use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgGroup, Parser};
use tracing::{debug, info, Level};

use portcheck_rs::config::{ScanConfig, DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT_SECS, DEFAULT_UDP_WORKERS};
use portcheck_rs::output::{self, OutputFormat};
use portcheck_rs::types::ProtocolSelector;
use portcheck_rs::{ports, scanner, targets};

/// portcheck-rs — firewall port tester: TCP connects and best-effort UDP probes.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "portcheck-rs",
    version,
    about = "Firewall port tester (TCP connect + best-effort UDP) with source address selection.",
    long_about = None,
    group(ArgGroup::new("hosts").required(true).args(["targets", "targets_file"])),
    group(ArgGroup::new("portlist").required(true).args(["ports", "ports_file"]))
)]
struct Cli {
    /// Comma separated hosts: IPs, hostnames or CIDR blocks.
    #[arg(long)]
    targets: Option<String>,

    /// File with one host per line (`#` comments allowed).
    #[arg(long = "targets-file")]
    targets_file: Option<PathBuf>,

    /// Comma separated ports or ranges, e.g. 22,80,30000-30010.
    #[arg(long)]
    ports: Option<String>,

    /// File with one port or range per line.
    #[arg(long = "ports-file")]
    ports_file: Option<PathBuf>,

    /// Protocol to test.
    #[arg(long, value_enum, default_value_t = ProtocolSelector::Tcp)]
    proto: ProtocolSelector,

    /// Parallel probe attempts.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Maximum UDP probes blocked waiting for a reply at once.
    #[arg(long = "udp-workers", default_value_t = DEFAULT_UDP_WORKERS)]
    udp_workers: usize,

    /// Timeout in seconds per port attempt.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: f64,

    /// Output file; stdout when omitted.
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Source IP to bind for outgoing probes (forces NIC selection).
    #[arg(long)]
    bind: Option<String>,

    /// Log parsed inputs and per-probe outcomes to stderr.
    #[arg(long, short = 'v', default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let hosts = match (&cli.targets, &cli.targets_file) {
        (Some(list), _) => targets::parse_targets_str(list)?,
        (None, Some(path)) => targets::load_targets_from_path(path)?,
        (None, None) => Vec::new(),
    };
    let ports = match (&cli.ports, &cli.ports_file) {
        (Some(spec), _) => ports::parse_ports_spec(spec)?,
        (None, Some(path)) => ports::load_ports_from_path(path)?,
        (None, None) => Vec::new(),
    };
    let config = ScanConfig::new(cli.concurrency, cli.udp_workers, cli.timeout, cli.bind.as_deref())?;

    debug!(?hosts, "target hosts");
    debug!(
        count = ports.len(),
        first = ?&ports[..ports.len().min(10)],
        "ports parsed"
    );
    info!(
        hosts = hosts.len(),
        ports = ports.len(),
        proto = ?cli.proto,
        concurrency = config.concurrency,
        udp_workers = config.udp_workers,
        timeout = ?config.timeout,
        bind = ?config.bind,
        "starting probes"
    );

    let results = scanner::run_checks(&hosts, &ports, cli.proto, &config).await?;
    output::write_results(&results, cli.output.as_deref(), cli.format)?;
    if let Some(path) = cli.output.as_deref() {
        info!("wrote {} results to {}", results.len(), path.display());
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
