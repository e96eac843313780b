use std::fmt;

use clap::ValueEnum;
use serde::{Serialize, Serializer};

/// Transport protocol of a single probe.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("tcp"),
            Protocol::Udp => f.write_str("udp"),
        }
    }
}

/// Which protocols to probe for every (host, port) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ProtocolSelector {
    #[default]
    Tcp,
    Udp,
    Both,
}

impl ProtocolSelector {
    /// Protocols selected, in the order tasks are generated for each pair.
    pub fn protocols(self) -> &'static [Protocol] {
        match self {
            ProtocolSelector::Tcp => &[Protocol::Tcp],
            ProtocolSelector::Udp => &[Protocol::Udp],
            ProtocolSelector::Both => &[Protocol::Tcp, Protocol::Udp],
        }
    }
}

/// One unit of probing work.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Task {
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
}

impl Task {
    pub fn new(host: impl Into<String>, port: u16, protocol: Protocol) -> Self {
        Self {
            host: host.into(),
            port,
            protocol,
        }
    }
}

/// Classified result of one probe attempt.
///
/// `NoResponse` is UDP only and deliberately inconclusive: the datagram may have been
/// dropped by a filter, ignored by a listening service, or discarded by a closed port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Open,
    Closed,
    Timeout,
    NoResponse,
    Error(String),
}

impl ProbeOutcome {
    /// Short label without the error detail, used for summaries.
    pub fn label(&self) -> &'static str {
        match self {
            ProbeOutcome::Open => "open",
            ProbeOutcome::Closed => "closed",
            ProbeOutcome::Timeout => "timeout",
            ProbeOutcome::NoResponse => "no-response",
            ProbeOutcome::Error(_) => "error",
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Error(detail) => write!(f, "error:{detail}"),
            other => f.write_str(other.label()),
        }
    }
}

impl Serialize for ProbeOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One finished probe, as handed to the result writer.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProbeResult {
    #[serde(rename = "src")]
    pub source: String,
    #[serde(rename = "dst")]
    pub destination: String,
    pub port: u16,
    #[serde(rename = "proto")]
    pub protocol: Protocol,
    #[serde(rename = "status")]
    pub outcome: ProbeOutcome,
    #[serde(rename = "elapsed", serialize_with = "round_millis")]
    pub elapsed_secs: f64,
}

impl ProbeResult {
    /// Record for a task whose probe could not produce a network answer at all.
    pub fn failed(task: &Task, source: String, destination: String, detail: impl Into<String>) -> Self {
        Self {
            source,
            destination,
            port: task.port,
            protocol: task.protocol,
            outcome: ProbeOutcome::Error(detail.into()),
            elapsed_secs: 0.0,
        }
    }
}

fn round_millis<S: Serializer>(secs: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64((secs * 1000.0).round() / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_labels_match_status_column() {
        assert_eq!(ProbeOutcome::Open.to_string(), "open");
        assert_eq!(ProbeOutcome::Closed.to_string(), "closed");
        assert_eq!(ProbeOutcome::Timeout.to_string(), "timeout");
        assert_eq!(ProbeOutcome::NoResponse.to_string(), "no-response");
        assert_eq!(
            ProbeOutcome::Error("Network is unreachable".into()).to_string(),
            "error:Network is unreachable"
        );
    }

    #[test]
    fn result_serializes_with_short_column_names() {
        let r = ProbeResult {
            source: "10.0.0.5".into(),
            destination: "10.0.0.9".into(),
            port: 443,
            protocol: Protocol::Tcp,
            outcome: ProbeOutcome::Open,
            elapsed_secs: 0.012_345,
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["src"], "10.0.0.5");
        assert_eq!(v["dst"], "10.0.0.9");
        assert_eq!(v["port"], 443);
        assert_eq!(v["proto"], "tcp");
        assert_eq!(v["status"], "open");
        assert_eq!(v["elapsed"], 0.012);
    }

    #[test]
    fn selector_expands_tcp_before_udp() {
        assert_eq!(
            ProtocolSelector::Both.protocols(),
            &[Protocol::Tcp, Protocol::Udp]
        );
        assert_eq!(ProtocolSelector::Udp.protocols(), &[Protocol::Udp]);
    }
}
