use anyhow::Result;
use if_addrs::get_if_addrs;
use std::net::IpAddr;

/// Addresses currently assigned to local interfaces, loopback included.
pub fn local_addresses() -> Result<Vec<IpAddr>> {
    let mut out: Vec<IpAddr> = get_if_addrs()?.into_iter().map(|i| i.ip()).collect();
    out.sort();
    out.dedup();
    Ok(out)
}

/// Whether `ip` can be used as a bind address on this machine.
///
/// The unspecified address always qualifies. Returns `None` when interfaces
/// cannot be enumerated.
pub fn is_local_address(ip: IpAddr) -> Option<bool> {
    if ip.is_unspecified() {
        return Some(true);
    }
    local_addresses().ok().map(|addrs| addrs.contains(&ip))
}
