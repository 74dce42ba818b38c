//! Quarantine registry: advisory isolation state for internal endpoints.
//!
//! Quarantine here is a surfaced state, not a datapath block; external
//! enforcers consume it. Every successful state transition is recorded in the
//! audit ledger, and a transition whose audit entry cannot be persisted is
//! rolled back rather than reported successful.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::audit::{AuditError, AuditLedger};

/// Threat-score threshold above which the pipeline may quarantine on its own.
pub const CRITICAL_THRESHOLD: f64 = 0.90;

/// Audit action verbs emitted by the registry.
pub const ACTION_QUARANTINE: &str = "QUARANTINE_NODE";
pub const ACTION_RELEASE: &str = "RELEASE_NODE";

/// Lifecycle state of a quarantine record. Transitions only
/// `active → released`; re-quarantine creates a fresh record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuarantineState {
    Active,
    Released,
}

/// One quarantine lifecycle record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuarantineRecord {
    pub ip: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_score: Option<f64>,
    pub quarantined_at: DateTime<Utc>,
    pub auto_triggered: bool,
    pub status: QuarantineState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released_at: Option<DateTime<Utc>>,
}

/// Structured outcome of a quarantine request. Idempotent repeats are normal
/// statuses, not errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuarantineStatus {
    Quarantined,
    AlreadyQuarantined,
}

/// Structured outcome of a release request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStatus {
    Released,
    AlreadyReleased,
    NotFound,
}

/// Errors raised by registry mutations.
#[derive(Debug, Error, Diagnostic)]
pub enum QuarantineError {
    /// The audit entry for the transition could not be persisted; the
    /// transition was rolled back.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Audit(#[from] AuditError),
}

/// Quarantine request as received from the control plane or the SOAR engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuarantineRequest {
    pub ip: String,
    #[serde(default = "QuarantineRequest::default_reason")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_score: Option<f64>,
    /// True when triggered by automation rather than an analyst.
    #[serde(default)]
    pub auto: bool,
}

impl QuarantineRequest {
    fn default_reason() -> String {
        "Manual quarantine by security analyst".to_string()
    }

    pub fn manual(ip: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            reason: reason.into(),
            threat_score: None,
            auto: false,
        }
    }
}

/// Release request as received from the control plane.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReleaseRequest {
    pub ip: String,
    #[serde(default = "ReleaseRequest::default_released_by")]
    pub released_by: String,
}

impl ReleaseRequest {
    fn default_released_by() -> String {
        "security-analyst".to_string()
    }
}

/// Active and historical records, as surfaced to the control plane.
#[derive(Clone, Debug, Serialize)]
pub struct QuarantineListing {
    pub active: Vec<QuarantineRecord>,
    pub released: Vec<QuarantineRecord>,
}

/// Registry of quarantined endpoints.
///
/// A single mutex serializes every state transition and the `is_quarantined`
/// hot-path check, so an idempotent `quarantine` can never race itself into a
/// duplicate active record.
pub struct QuarantineRegistry {
    audit: Arc<AuditLedger>,
    inner: Mutex<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    /// All records in creation order; history is never discarded.
    records: Vec<QuarantineRecord>,
    /// ip → index into `records` of the currently active record.
    active: FxHashMap<String, usize>,
}

impl QuarantineRegistry {
    pub fn new(audit: Arc<AuditLedger>) -> Self {
        Self {
            audit,
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    /// Quarantine an endpoint. Idempotent: an existing active record yields
    /// `AlreadyQuarantined` without a duplicate record or audit entry.
    pub fn quarantine(&self, req: &QuarantineRequest) -> Result<QuarantineStatus, QuarantineError> {
        let mut inner = self.inner.lock();
        if inner.active.contains_key(&req.ip) {
            return Ok(QuarantineStatus::AlreadyQuarantined);
        }

        let record = QuarantineRecord {
            ip: req.ip.clone(),
            reason: req.reason.clone(),
            threat_score: req.threat_score,
            quarantined_at: Utc::now(),
            auto_triggered: req.auto,
            status: QuarantineState::Active,
            released_at: None,
        };
        let index = inner.records.len();
        inner.records.push(record);
        inner.active.insert(req.ip.clone(), index);

        let trigger = if req.auto { "AUTO" } else { "MANUAL" };
        tracing::warn!(
            target: "shadowscope::quarantine",
            ip = %req.ip,
            trigger,
            reason = %req.reason,
            threat_score = ?req.threat_score,
            "node quarantined"
        );

        let mut details: FxHashMap<String, Value> = FxHashMap::default();
        details.insert("reason".into(), json!(req.reason));
        details.insert("threat_score".into(), json!(req.threat_score));
        details.insert("trigger".into(), json!(trigger));
        let actor = if req.auto {
            "automation-pipeline"
        } else {
            "security-analyst"
        };
        if let Err(err) = self.audit.append(actor, ACTION_QUARANTINE, &req.ip, details) {
            // The transition must not outlive a lost audit entry.
            inner.records.pop();
            inner.active.remove(&req.ip);
            return Err(err.into());
        }

        Ok(QuarantineStatus::Quarantined)
    }

    /// Release a quarantined endpoint back to normal operation.
    pub fn release(&self, req: &ReleaseRequest) -> Result<ReleaseStatus, QuarantineError> {
        let mut inner = self.inner.lock();
        let Some(index) = inner.active.get(&req.ip).copied() else {
            // Distinguish "never quarantined" from "already released".
            let seen = inner.records.iter().any(|record| record.ip == req.ip);
            return Ok(if seen {
                ReleaseStatus::AlreadyReleased
            } else {
                ReleaseStatus::NotFound
            });
        };

        let released_at = Utc::now();
        inner.records[index].status = QuarantineState::Released;
        inner.records[index].released_at = Some(released_at);
        inner.active.remove(&req.ip);

        tracing::info!(
            target: "shadowscope::quarantine",
            ip = %req.ip,
            released_by = %req.released_by,
            "node released from quarantine"
        );

        let mut details: FxHashMap<String, Value> = FxHashMap::default();
        details.insert("reason".into(), json!("Administrative override"));
        details.insert("previous_status".into(), json!("active"));
        if let Err(err) = self
            .audit
            .append(&req.released_by, ACTION_RELEASE, &req.ip, details)
        {
            inner.records[index].status = QuarantineState::Active;
            inner.records[index].released_at = None;
            inner.active.insert(req.ip.clone(), index);
            return Err(err.into());
        }

        Ok(ReleaseStatus::Released)
    }

    /// O(1) check used on every processed event.
    pub fn is_quarantined(&self, ip: &str) -> bool {
        self.inner.lock().active.contains_key(ip)
    }

    /// Latest record for an ip, if any.
    pub fn status(&self, ip: &str) -> Option<QuarantineRecord> {
        let inner = self.inner.lock();
        inner
            .records
            .iter()
            .rev()
            .find(|record| record.ip == ip)
            .cloned()
    }

    /// Active plus historical records.
    pub fn list(&self) -> QuarantineListing {
        let inner = self.inner.lock();
        let (active, released): (Vec<_>, Vec<_>) = inner
            .records
            .iter()
            .cloned()
            .partition(|record| record.status == QuarantineState::Active);
        QuarantineListing { active, released }
    }

    /// Auto-quarantine when a classifier confidence crosses
    /// [`CRITICAL_THRESHOLD`]. Returns whether a new record was created.
    pub fn auto_quarantine_if_critical(
        &self,
        ip: &str,
        score: f64,
        reason: &str,
    ) -> Result<bool, QuarantineError> {
        if score < CRITICAL_THRESHOLD {
            return Ok(false);
        }
        let reason = if reason.is_empty() {
            format!("Auto-quarantine: threat score {:.0}% exceeds threshold", score * 100.0)
        } else {
            reason.to_string()
        };
        let req = QuarantineRequest {
            ip: ip.to_string(),
            reason,
            threat_score: Some(score),
            auto: true,
        };
        Ok(self.quarantine(&req)? == QuarantineStatus::Quarantined)
    }
}
