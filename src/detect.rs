//! Rule-based anomaly detection over single flow events.
//!
//! The detector is stateless and deterministic: the same event always yields
//! the same verdict, and rules are checked in a fixed order with the first
//! match winning.

use std::sync::Arc;

use crate::alerts::Severity;
use crate::domains::DomainClassifier;
use crate::flow::{FlowEvent, Protocol};

/// Ports considered ordinary for outbound traffic.
const KNOWN_PORTS: &[u16] = &[80, 443, 8080, 53];

/// DNS flows carrying more than this many bytes look like tunneling.
const DNS_TUNNEL_BYTES: u64 = 500;

/// A triggered detection: which rule fired, how severe, and why.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Detection {
    /// Short rule label fed to the technique mapper alongside the reason.
    pub rule: &'static str,
    pub severity: Severity,
    pub reason: String,
}

/// Detects shadow-AI usage and anomalous flow patterns.
pub struct AnomalyDetector {
    domains: Arc<DomainClassifier>,
}

impl AnomalyDetector {
    pub fn new(domains: Arc<DomainClassifier>) -> Self {
        Self { domains }
    }

    /// Evaluate one event. Rules in order, first match wins:
    ///
    /// 1. DPI host resolves to a known AI service.
    /// 2. Internal → external traffic on an unusual destination port.
    /// 3. Oversized DNS payload (tunneling suspect).
    pub fn detect(&self, event: &FlowEvent) -> Option<Detection> {
        if let Some(host) = event.observed_host()
            && self.domains.is_ai_domain(host)
        {
            return Some(Detection {
                rule: "Shadow AI",
                severity: Severity::High,
                reason: format!("Known AI Service Accessed: {host}"),
            });
        }

        if self.domains.is_internal(&event.source_ip)
            && !self.domains.is_internal(&event.destination_ip)
            && !KNOWN_PORTS.contains(&event.destination_port)
        {
            return Some(Detection {
                rule: "Suspicious Traffic",
                severity: Severity::High,
                reason: format!(
                    "Outbound traffic to {} on unusual port {}",
                    event.destination_ip, event.destination_port
                ),
            });
        }

        if event.protocol == Protocol::Dns && event.bytes_sent > DNS_TUNNEL_BYTES {
            return Some(Detection {
                rule: "Anomalous DNS",
                severity: Severity::High,
                reason: "Potential DNS Tunneling (Large DNS Payload)".to_string(),
            });
        }

        None
    }
}
