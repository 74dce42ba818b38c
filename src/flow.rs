//! Flow event model for the shadowscope pipeline.
//!
//! A [`FlowEvent`] is one observation of network traffic: who talked to whom,
//! over which protocol, how many bytes, plus whatever deep-packet-inspection
//! metadata the capture layer managed to extract. Events are immutable once
//! admitted to the pipeline; enrichment happens on the pipeline's own copy.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dlp::DlpMatch;
use crate::quarantine::QuarantineState;

/// Transport or application protocol label for a flow.
///
/// Serialized as stable uppercase strings (`"TCP"`, `"HTTPS"`, ...) so events
/// survive broker round-trips and schema evolution; never integer ordinals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
    Http,
    Https,
    Grpc,
    Dns,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Http => "HTTP",
            Protocol::Https => "HTTPS",
            Protocol::Grpc => "GRPC",
            Protocol::Dns => "DNS",
        };
        write!(f, "{label}")
    }
}

/// Metadata keys the enrichment stages understand. Anything else rides along
/// untouched.
pub const META_HOST: &str = "host";
pub const META_SNI: &str = "sni";
pub const META_DNS_QUERY: &str = "dns_query";
pub const META_USER_AGENT: &str = "user_agent";
pub const META_JA3_HASH: &str = "ja3_hash";

/// One network flow observation.
///
/// Only the addressing fields and the protocol are required on the wire; every
/// other field defaults. The identity, DLP, and quarantine fields are filled by
/// the analyzer pipeline, never by producers.
///
/// # Examples
///
/// ```
/// use shadowscope::flow::{FlowEvent, Protocol};
///
/// let event = FlowEvent::new("192.168.1.10", 51234, "1.2.3.4", 443, Protocol::Https)
///     .with_metadata("host", "chatgpt.com")
///     .with_bytes(2048, 512);
///
/// assert_eq!(event.observed_host(), Some("chatgpt.com"));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowEvent {
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    pub source_ip: String,
    pub source_port: u16,
    pub destination_ip: String,
    pub destination_port: u16,
    pub protocol: Protocol,
    #[serde(default)]
    pub bytes_sent: u64,
    #[serde(default)]
    pub bytes_received: u64,
    #[serde(default)]
    pub duration_ms: f64,
    /// Truncated text sample of the payload, when capture managed to keep one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_sample: Option<String>,
    #[serde(default)]
    pub metadata: FxHashMap<String, String>,

    // Identity enrichment, filled by the pipeline from the identity resolver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    // Quarantine status of the source at processing time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarantine_status: Option<QuarantineState>,

    // DLP results.
    #[serde(default)]
    pub dlp_violation: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dlp_snippets: Vec<DlpMatch>,
}

impl FlowEvent {
    /// Create a flow event with the required addressing fields; everything
    /// else starts at its default.
    pub fn new(
        source_ip: impl Into<String>,
        source_port: u16,
        destination_ip: impl Into<String>,
        destination_port: u16,
        protocol: Protocol,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            source_ip: source_ip.into(),
            source_port,
            destination_ip: destination_ip.into(),
            destination_port,
            protocol,
            bytes_sent: 0,
            bytes_received: 0,
            duration_ms: 0.0,
            payload_sample: None,
            metadata: FxHashMap::default(),
            user_id: None,
            user_name: None,
            department: None,
            quarantine_status: None,
            dlp_violation: false,
            dlp_snippets: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[must_use]
    pub fn with_bytes(mut self, sent: u64, received: u64) -> Self {
        self.bytes_sent = sent;
        self.bytes_received = received;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_payload(mut self, sample: impl Into<String>) -> Self {
        self.payload_sample = Some(sample.into());
        self
    }

    /// The destination hostname observed by DPI, coalescing the HTTP `host`
    /// header, the TLS SNI, and the DNS query name in that order.
    pub fn observed_host(&self) -> Option<&str> {
        [META_HOST, META_SNI, META_DNS_QUERY]
            .iter()
            .find_map(|key| self.metadata.get(*key))
            .map(String::as_str)
            .filter(|host| !host.is_empty())
    }

    /// Total bytes moved in either direction.
    pub fn byte_count(&self) -> u64 {
        self.bytes_sent + self.bytes_received
    }
}
