use std::io;
use std::net::{IpAddr, SocketAddr};

use tokio::net::TcpSocket;
use tokio::time::{self, Instant};
use tracing::debug;

use super::{unresolved, Attempt, ProbeSettings};
use crate::resolve::{resolve_host, source_address};
use crate::types::{ProbeOutcome, ProbeResult, Protocol};

/// Probe one TCP port with a full connect, bounded by `settings.timeout`.
///
/// - handshake completed: `Open`
/// - RST (connection refused): `Closed`
/// - no answer before the deadline: `Timeout`
/// - anything else: `Error` with the OS description
///
/// The socket is owned by this call and dropped on every path.
pub async fn probe(host: &str, port: u16, settings: &ProbeSettings) -> ProbeResult {
    let dst = match resolve_host(host).await {
        Ok(ip) => ip,
        Err(e) => return unresolved(host, port, Protocol::Tcp, settings, e),
    };
    let addr = SocketAddr::new(dst, port);

    let start = Instant::now();
    let attempt = connect(addr, settings).await;
    let elapsed = start.elapsed();

    debug!(%addr, outcome = %attempt.outcome, ?elapsed, "tcp probe finished");
    ProbeResult {
        source: source_address(attempt.endpoint, attempt.applied_bind, Some(dst)),
        destination: dst.to_string(),
        port,
        protocol: Protocol::Tcp,
        outcome: attempt.outcome,
        elapsed_secs: elapsed.as_secs_f64(),
    }
}

async fn connect(addr: SocketAddr, settings: &ProbeSettings) -> Attempt {
    let socket = match new_socket(addr) {
        Ok(s) => s,
        Err(e) => return Attempt::error(e, None),
    };
    let applied_bind = settings.bind.and_then(|ip| bind_source(&socket, ip));
    let endpoint = socket.local_addr().ok().map(|a| a.ip());

    let (outcome, endpoint) = match time::timeout(settings.timeout, socket.connect(addr)).await {
        Ok(Ok(stream)) => {
            let local = stream.local_addr().ok().map(|a| a.ip()).or(endpoint);
            (ProbeOutcome::Open, local)
        }
        Ok(Err(e)) => (classify_connect_error(&e), endpoint),
        Err(_) => (ProbeOutcome::Timeout, endpoint),
    };
    Attempt {
        outcome,
        endpoint,
        applied_bind,
    }
}

fn new_socket(addr: SocketAddr) -> io::Result<TcpSocket> {
    if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
}

/// Bind to `ip` on an ephemeral port. Failure keeps the OS default route.
fn bind_source(socket: &TcpSocket, ip: IpAddr) -> Option<IpAddr> {
    match socket.bind(SocketAddr::new(ip, 0)) {
        Ok(()) => Some(ip),
        Err(e) => {
            debug!(bind = %ip, error = %e, "tcp bind failed, using default route");
            None
        }
    }
}

fn classify_connect_error(e: &io::Error) -> ProbeOutcome {
    match e.kind() {
        io::ErrorKind::ConnectionRefused => ProbeOutcome::Closed,
        // The kernel gave up on SYN retransmits before our own deadline.
        io::ErrorKind::TimedOut => ProbeOutcome::Timeout,
        _ => ProbeOutcome::Error(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_maps_to_closed() {
        let e = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert_eq!(classify_connect_error(&e), ProbeOutcome::Closed);
    }

    #[test]
    fn other_errors_carry_detail() {
        let e = io::Error::new(io::ErrorKind::Other, "Network is unreachable");
        assert_eq!(
            classify_connect_error(&e),
            ProbeOutcome::Error("Network is unreachable".into())
        );
    }
}
