//! Host resolution and local source-address discovery shared by both probers.
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};

use tracing::debug;

/// Placeholder reported when no local address can be determined.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Port used when asking the OS which local address routes to a destination.
const ROUTE_PROBE_PORT: u16 = 53;

/// Resolve `host` to one address, preferring IPv4.
pub async fn resolve_host(host: &str) -> io::Result<IpAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, 0)).await?.collect();
    pick_address(host, addrs)
}

/// Blocking variant of [`resolve_host`] for code already running off the async runtime.
pub fn resolve_host_blocking(host: &str) -> io::Result<IpAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }
    let addrs: Vec<SocketAddr> = (host, 0).to_socket_addrs()?.collect();
    pick_address(host, addrs)
}

fn pick_address(host: &str, addrs: Vec<SocketAddr>) -> io::Result<IpAddr> {
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .map(SocketAddr::ip)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses found for {host}"),
            )
        })
}

/// Local address the OS would pick to reach `dst`.
///
/// Connecting a UDP socket sends nothing; it only fixes the route and local endpoint.
pub fn local_ip_for_target(dst: IpAddr) -> Option<IpAddr> {
    let any: IpAddr = match dst {
        IpAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
        IpAddr::V6(_) => Ipv6Addr::UNSPECIFIED.into(),
    };
    let socket = UdpSocket::bind(SocketAddr::new(any, 0)).ok()?;
    socket.connect(SocketAddr::new(dst, ROUTE_PROBE_PORT)).ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified()).then_some(ip)
}

/// Pick the reported source address.
///
/// Order: the socket's own local endpoint, then the bind address that was
/// actually applied, then the routing heuristic, then [`UNKNOWN_SOURCE`].
pub fn source_address(
    endpoint: Option<IpAddr>,
    applied_bind: Option<IpAddr>,
    dst: Option<IpAddr>,
) -> String {
    if let Some(ip) = endpoint.filter(|ip| !ip.is_unspecified()) {
        return ip.to_string();
    }
    if let Some(ip) = applied_bind.filter(|ip| !ip.is_unspecified()) {
        return ip.to_string();
    }
    match dst.and_then(local_ip_for_target) {
        Some(ip) => ip.to_string(),
        None => {
            debug!(?dst, "could not determine local source address");
            UNKNOWN_SOURCE.to_string()
        }
    }
}
