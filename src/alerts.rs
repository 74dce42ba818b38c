//! Alert records and the bounded store of recent alerts.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dlp::DlpMatch;
use crate::mitre::TechniqueTag;

/// Alert severity, ordered from least to most severe.
///
/// Serialized as stable uppercase strings so alerts survive broker
/// round-trips and playbook conditions can match on them.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        };
        write!(f, "{label}")
    }
}

/// Immutable alert record produced by the analyzer.
///
/// Ids are `alert-<uuid-v7>`: time-ordered like the old timestamp+counter
/// scheme, but unique across restarts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub severity: Severity,
    pub description: String,
    /// Source node id (the internal endpoint).
    pub source: String,
    /// Target node id, using the enriched hostname when available.
    pub target: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technique: Option<TechniqueTag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dlp_snippets: Vec<DlpMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ml_classification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ml_confidence: Option<f64>,
}

impl Alert {
    pub fn new(
        severity: Severity,
        description: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("alert-{}", Uuid::now_v7()),
            severity,
            description: description.into(),
            source: source.into(),
            target: target.into(),
            timestamp,
            technique: None,
            dlp_snippets: Vec::new(),
            ml_classification: None,
            ml_confidence: None,
        }
    }

    #[must_use]
    pub fn with_technique(mut self, technique: Option<TechniqueTag>) -> Self {
        self.technique = technique;
        self
    }

    #[must_use]
    pub fn with_dlp_snippets(mut self, snippets: Vec<DlpMatch>) -> Self {
        self.dlp_snippets = snippets;
        self
    }

    #[must_use]
    pub fn with_classification(mut self, label: impl Into<String>, confidence: f64) -> Self {
        self.ml_classification = Some(label.into());
        self.ml_confidence = Some(confidence);
        self
    }
}

/// Default capacity of the shared alert ring.
pub const DEFAULT_ALERT_CAPACITY: usize = 100;

/// Bounded ring buffer of recent alerts.
///
/// When the ring is full the oldest alert is dropped first. Reads return
/// snapshots in insertion order; all access is internally synchronized.
pub struct AlertStore {
    inner: Mutex<VecDeque<Alert>>,
    capacity: usize,
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ALERT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    /// Append an alert, evicting the oldest when the ring is full.
    pub fn add(&self, alert: Alert) {
        let mut inner = self.inner.lock();
        if inner.len() == self.capacity {
            inner.pop_front();
        }
        inner.push_back(alert);
    }

    /// Snapshot of stored alerts in insertion order.
    pub fn list(&self) -> Vec<Alert> {
        self.inner.lock().iter().cloned().collect()
    }

    /// Look up an alert by id.
    pub fn get(&self, id: &str) -> Option<Alert> {
        self.inner.lock().iter().find(|alert| alert.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
