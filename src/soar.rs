//! SOAR playbook engine: declarative alert-predicate → response action.
//!
//! The engine never reaches into the quarantine registry directly; it is
//! handed an [`Enforcer`] capability at construction, which keeps response
//! execution testable and the module dependency graph one-directional.

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::alerts::Alert;
use crate::quarantine::{
    QuarantineError, QuarantineRegistry, QuarantineRequest, QuarantineStatus,
};

/// Response actions a playbook can take.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybookAction {
    Quarantine,
}

/// A declarative response rule.
///
/// The condition is a map of alert-field → expected value. Every key must be
/// present on the alert; values match by equality, by membership when the
/// expected value is a list, or by case-insensitive `*` glob when it is a
/// string containing `*`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Playbook {
    pub id: String,
    pub name: String,
    pub condition: FxHashMap<String, Value>,
    pub action: PlaybookAction,
    pub enabled: bool,
}

impl Playbook {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        condition: FxHashMap<String, Value>,
        action: PlaybookAction,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            condition,
            action,
            enabled: true,
        }
    }

    /// Evaluate the condition against an alert's JSON projection.
    pub fn matches(&self, alert: &Value) -> bool {
        if !self.enabled {
            return false;
        }
        self.condition.iter().all(|(key, expected)| {
            let Some(actual) = alert.get(key) else {
                return false;
            };
            value_matches(actual, expected)
        })
    }
}

fn value_matches(actual: &Value, expected: &Value) -> bool {
    match expected {
        Value::Array(options) => options.contains(actual),
        Value::String(pattern) if pattern.contains('*') => glob_matches(actual, pattern),
        _ => actual == expected,
    }
}

/// Case-insensitive glob match anchored at the start of the value, with `*`
/// as the only wildcard.
fn glob_matches(actual: &Value, pattern: &str) -> bool {
    let escaped = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    let Ok(re) = Regex::new(&format!("(?i)^{escaped}")) else {
        return false;
    };
    let text = match actual {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    re.is_match(&text)
}

/// Capability through which the engine executes containment.
pub trait Enforcer: Send + Sync {
    fn quarantine(
        &self,
        ip: &str,
        reason: &str,
        score: Option<f64>,
    ) -> Result<QuarantineStatus, QuarantineError>;
}

impl Enforcer for QuarantineRegistry {
    fn quarantine(
        &self,
        ip: &str,
        reason: &str,
        score: Option<f64>,
    ) -> Result<QuarantineStatus, QuarantineError> {
        let req = QuarantineRequest {
            ip: ip.to_string(),
            reason: reason.to_string(),
            threat_score: score,
            auto: true,
        };
        QuarantineRegistry::quarantine(self, &req)
    }
}

/// One executed response, reported back to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub playbook: String,
    pub action: PlaybookAction,
    pub target: String,
}

/// Security orchestration, automation, and response engine.
pub struct SoarEngine {
    playbooks: Vec<Playbook>,
    enforcer: Arc<dyn Enforcer>,
    action_timeout: Duration,
}

impl SoarEngine {
    /// Build the engine with the default playbooks:
    ///
    /// 1. Any CRITICAL alert → quarantine.
    /// 2. HIGH alert classified as shadow AI → quarantine.
    pub fn new(enforcer: Arc<dyn Enforcer>) -> Self {
        let playbooks = vec![
            Playbook::new(
                "soar-pb-001",
                "Auto-Quarantine Critical Threats",
                FxHashMap::from_iter([("severity".to_string(), Value::from("CRITICAL"))]),
                PlaybookAction::Quarantine,
            ),
            Playbook::new(
                "soar-pb-002",
                "Block Active Shadow AI Anomalies",
                FxHashMap::from_iter([
                    ("severity".to_string(), Value::from("HIGH")),
                    ("ml_classification".to_string(), Value::from("shadow_ai")),
                ]),
                PlaybookAction::Quarantine,
            ),
        ];
        Self::with_playbooks(enforcer, playbooks)
    }

    pub fn with_playbooks(enforcer: Arc<dyn Enforcer>, playbooks: Vec<Playbook>) -> Self {
        Self {
            playbooks,
            enforcer,
            action_timeout: Duration::from_secs(1),
        }
    }

    #[must_use]
    pub fn with_action_timeout(mut self, action_timeout: Duration) -> Self {
        self.action_timeout = action_timeout;
        self
    }

    pub fn playbooks(&self) -> &[Playbook] {
        &self.playbooks
    }

    /// Evaluate an alert against every enabled playbook in declaration order,
    /// executing each matched action. A failed or timed-out action is logged
    /// and does not stop the remaining playbooks.
    pub async fn evaluate(&self, alert: &Alert) -> Vec<ActionOutcome> {
        let alert_json = match serde_json::to_value(alert) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(
                    target: "shadowscope::soar",
                    error = %err,
                    "failed to project alert for playbook evaluation"
                );
                return Vec::new();
            }
        };

        let mut outcomes = Vec::new();
        for playbook in &self.playbooks {
            if !playbook.matches(&alert_json) {
                continue;
            }
            tracing::warn!(
                target: "shadowscope::soar",
                playbook = %playbook.name,
                action = ?playbook.action,
                target = %alert.source,
                "executing playbook action"
            );
            match playbook.action {
                PlaybookAction::Quarantine => {
                    if self.execute_quarantine(&alert.source).await {
                        outcomes.push(ActionOutcome {
                            playbook: playbook.name.clone(),
                            action: playbook.action,
                            target: alert.source.clone(),
                        });
                    }
                }
            }
        }
        outcomes
    }

    async fn execute_quarantine(&self, ip: &str) -> bool {
        if ip.is_empty() {
            return false;
        }
        let enforcer = Arc::clone(&self.enforcer);
        let ip_owned = ip.to_string();
        // The enforcer may touch disk (audit ledger), so it runs off the
        // scheduler thread with a hard deadline.
        let task = tokio::task::spawn_blocking(move || {
            enforcer.quarantine(
                &ip_owned,
                "SOAR auto-quarantine playbook activated",
                Some(1.0),
            )
        });
        match tokio::time::timeout(self.action_timeout, task).await {
            Ok(Ok(Ok(_status))) => true,
            Ok(Ok(Err(err))) => {
                tracing::error!(
                    target: "shadowscope::soar",
                    ip,
                    error = %err,
                    "quarantine action failed"
                );
                false
            }
            Ok(Err(join_err)) => {
                tracing::error!(
                    target: "shadowscope::soar",
                    ip,
                    error = %join_err,
                    "quarantine action panicked"
                );
                false
            }
            Err(_) => {
                tracing::error!(
                    target: "shadowscope::soar",
                    ip,
                    timeout_ms = self.action_timeout.as_millis() as u64,
                    "quarantine action timed out"
                );
                false
            }
        }
    }
}
