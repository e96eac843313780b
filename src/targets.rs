use anyhow::{bail, Context, Result};
use ipnet::IpNet;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Largest number of hosts a single CIDR entry may expand to.
pub const MAX_CIDR_HOSTS: usize = 65_536;

/// Parse a comma separated target list (`10.0.0.1,db.example.com,10.1.0.0/30`).
pub fn parse_targets_str(s: &str) -> Result<Vec<String>> {
    let mut list = HostList::default();
    for item in s.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        list.push_entry(item)?;
    }
    Ok(list.hosts)
}

/// Parse a hosts file: one target per line, `#` starts a comment.
pub fn parse_targets_file_str(s: &str) -> Result<Vec<String>> {
    let mut list = HostList::default();
    for (idx, raw_line) in s.lines().enumerate() {
        let line = raw_line.split('#').next().map(str::trim).unwrap_or("");
        if line.is_empty() {
            continue;
        }
        list.push_entry(line)
            .with_context(|| format!("line {}: invalid target: {line}", idx + 1))?;
    }
    Ok(list.hosts)
}

/// Load targets from a hosts file.
pub fn load_targets_from_path(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("failed to read targets file: {}", path.as_ref().display()))?;
    parse_targets_file_str(&content)
}

/// Expand a CIDR block into its host addresses.
///
/// IPv4 blocks exclude the network and broadcast addresses except for /31 and /32.
pub fn expand_cidr(net: IpNet) -> Result<Vec<String>> {
    let hosts: Vec<String> = net
        .hosts()
        .take(MAX_CIDR_HOSTS + 1)
        .map(|ip| ip.to_string())
        .collect();
    if hosts.len() > MAX_CIDR_HOSTS {
        bail!("{net} expands to more than {MAX_CIDR_HOSTS} hosts");
    }
    Ok(hosts)
}

#[derive(Default)]
struct HostList {
    seen: HashSet<String>,
    hosts: Vec<String>,
}

impl HostList {
    fn push_entry(&mut self, entry: &str) -> Result<()> {
        if entry.contains('/') {
            let net: IpNet = entry
                .parse()
                .with_context(|| format!("invalid CIDR: {entry}"))?;
            for host in expand_cidr(net)? {
                self.push(host);
            }
            return Ok(());
        }
        if entry.chars().any(char::is_whitespace) {
            bail!("invalid host name: {entry:?}");
        }
        self.push(entry.to_string());
        Ok(())
    }

    fn push(&mut self, host: String) {
        if self.seen.insert(host.clone()) {
            self.hosts.push(host);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_list_trims_and_dedups() {
        let hosts = parse_targets_str(" 10.0.0.1, gw.example.net ,10.0.0.1,,").unwrap();
        assert_eq!(hosts, vec!["10.0.0.1", "gw.example.net"]);
    }

    #[test]
    fn expand_small_cidr_excludes_network_and_broadcast() {
        let hosts = parse_targets_str("192.168.1.0/30").unwrap();
        assert_eq!(hosts, vec!["192.168.1.1", "192.168.1.2"]);
    }

    #[test]
    fn single_host_cidr() {
        let hosts = parse_targets_str("10.9.8.7/32").unwrap();
        assert_eq!(hosts, vec!["10.9.8.7"]);
    }

    #[test]
    fn oversized_cidr_rejected() {
        assert!(parse_targets_str("10.0.0.0/8").is_err());
    }

    #[test]
    fn invalid_cidr_rejected() {
        assert!(parse_targets_str("10.0.0.0/40").is_err());
    }
}
