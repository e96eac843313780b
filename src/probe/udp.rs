use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use tracing::debug;

use super::{unresolved, Attempt, ProbeSettings};
use crate::resolve::{resolve_host_blocking, source_address};
use crate::types::{ProbeOutcome, ProbeResult, Protocol};

/// Datagram sent to every UDP target.
pub const PROBE_PAYLOAD: &[u8] = b"port-check\n";

const RECV_BUF_LEN: usize = 4096;

/// Best-effort UDP probe. Blocks the calling thread for up to `settings.timeout`.
///
/// - any datagram back: `Open`
/// - silence until the deadline: `NoResponse` (filtered, closed, or a service that
///   ignores the payload; UDP cannot tell these apart)
/// - the stack reports a delivery failure, e.g. ICMP port unreachable: `Error`
pub fn probe(host: &str, port: u16, settings: &ProbeSettings) -> ProbeResult {
    let dst = match resolve_host_blocking(host) {
        Ok(ip) => ip,
        Err(e) => return unresolved(host, port, Protocol::Udp, settings, e),
    };
    let addr = SocketAddr::new(dst, port);

    let start = Instant::now();
    let attempt = exchange(addr, settings, start);
    let elapsed = start.elapsed();

    debug!(%addr, outcome = %attempt.outcome, ?elapsed, "udp probe finished");
    ProbeResult {
        source: source_address(attempt.endpoint, attempt.applied_bind, Some(dst)),
        destination: dst.to_string(),
        port,
        protocol: Protocol::Udp,
        outcome: attempt.outcome,
        elapsed_secs: elapsed.as_secs_f64(),
    }
}

fn exchange(addr: SocketAddr, settings: &ProbeSettings, start: Instant) -> Attempt {
    let (socket, applied_bind) = match open_socket(addr, settings.bind) {
        Ok(pair) => pair,
        Err(e) => return Attempt::error(e, None),
    };
    if let Err(e) = socket.connect(addr) {
        return Attempt::error(e, applied_bind);
    }
    let endpoint = socket.local_addr().ok().map(|a| a.ip());
    let remaining = settings.timeout.saturating_sub(start.elapsed());
    Attempt {
        outcome: send_and_wait(&socket, remaining),
        endpoint,
        applied_bind,
    }
}

/// Open a socket bound to `bind` when possible, else to the unspecified address.
fn open_socket(addr: SocketAddr, bind: Option<IpAddr>) -> io::Result<(UdpSocket, Option<IpAddr>)> {
    if let Some(ip) = bind {
        if ip.is_ipv4() != addr.is_ipv4() {
            debug!(bind = %ip, %addr, "bind address family mismatch, using default route");
        } else {
            match UdpSocket::bind(SocketAddr::new(ip, 0)) {
                Ok(s) => return Ok((s, Some(ip))),
                Err(e) => debug!(bind = %ip, error = %e, "udp bind failed, using default route"),
            }
        }
    }
    let any: IpAddr = if addr.is_ipv4() {
        Ipv4Addr::UNSPECIFIED.into()
    } else {
        Ipv6Addr::UNSPECIFIED.into()
    };
    Ok((UdpSocket::bind(SocketAddr::new(any, 0))?, None))
}

fn send_and_wait(socket: &UdpSocket, remaining: Duration) -> ProbeOutcome {
    if remaining.is_zero() {
        return ProbeOutcome::NoResponse;
    }
    if let Err(e) = socket.set_read_timeout(Some(remaining)) {
        return ProbeOutcome::Error(e.to_string());
    }
    if let Err(e) = socket.send(PROBE_PAYLOAD) {
        return ProbeOutcome::Error(e.to_string());
    }
    let mut buf = [0u8; RECV_BUF_LEN];
    match socket.recv(&mut buf) {
        Ok(_) => ProbeOutcome::Open,
        Err(e) if is_deadline(&e) => ProbeOutcome::NoResponse,
        Err(e) => ProbeOutcome::Error(e.to_string()),
    }
}

// Unix reports an expired read timeout as WouldBlock, Windows as TimedOut.
fn is_deadline(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_bind_family_falls_back() {
        let dst = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9);
        let bind = Some(IpAddr::V6(Ipv6Addr::LOCALHOST));
        let (socket, applied) = open_socket(dst, bind).unwrap();
        assert_eq!(applied, None);
        assert!(socket.local_addr().unwrap().is_ipv4());
    }

    #[test]
    fn zero_budget_is_no_response() {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        assert_eq!(send_and_wait(&socket, Duration::ZERO), ProbeOutcome::NoResponse);
    }
}
