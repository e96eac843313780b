use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Parse a command-line port spec such as `22,80,30000-30010`.
///
/// Ranges are inclusive, duplicates are collapsed and first-seen order is kept.
/// Empty items between commas are ignored.
pub fn parse_ports_spec(spec: &str) -> Result<Vec<u16>> {
    let mut list = PortList::default();
    for item in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        list.push_entry(item)
            .with_context(|| format!("invalid port entry: {item}"))?;
    }
    Ok(list.ports)
}

/// Parse a ports file content: one port or `start-end` range per line.
///
/// Everything after `#` is a comment; blank lines are ignored.
pub fn parse_ports_str(s: &str) -> Result<Vec<u16>> {
    let mut list = PortList::default();
    for (idx, raw_line) in s.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.split('#').next().map(str::trim).unwrap_or("");
        if line.is_empty() {
            continue;
        }
        list.push_entry(line)
            .with_context(|| format!("line {line_no}: invalid port entry: {line}"))?;
    }
    Ok(list.ports)
}

/// Load a ports list from a file path. Errors if the file cannot be read or parsed.
pub fn load_ports_from_path(path: impl AsRef<Path>) -> Result<Vec<u16>> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("failed to read ports file: {}", path.as_ref().display()))?;
    parse_ports_str(&content)
}

#[derive(Default)]
struct PortList {
    seen: HashSet<u16>,
    ports: Vec<u16>,
}

impl PortList {
    fn push_entry(&mut self, entry: &str) -> Result<()> {
        if let Some((a, b)) = entry.split_once('-') {
            let start = parse_port_str(a.trim())
                .with_context(|| format!("invalid start in range: {a}"))?;
            let end = parse_port_str(b.trim())
                .with_context(|| format!("invalid end in range: {b}"))?;
            if start > end {
                bail!("invalid range {start}-{end} (start > end)");
            }
            for p in start..=end {
                self.push(p);
            }
            return Ok(());
        }
        let p = parse_port_str(entry)?;
        self.push(p);
        Ok(())
    }

    fn push(&mut self, port: u16) {
        if self.seen.insert(port) {
            self.ports.push(port);
        }
    }
}

fn parse_port_str(s: &str) -> Result<u16> {
    let val: u32 = s.parse::<u32>().map_err(|e| anyhow::anyhow!(e))?;
    if val == 0 || val > 65535 {
        bail!("port out of range: {val}");
    }
    Ok(val as u16)
}
