//! Contract for an optional supervised traffic classifier.
//!
//! Model internals are out of scope; the pipeline only depends on this trait
//! and treats the classifier as an optional constructor input. Labels ride on
//! alerts (`ml_classification`) where playbooks can match them, and a
//! sufficiently confident verdict can trigger auto-quarantine.

use crate::flow::FlowEvent;

/// Label assigned to shadow-AI traffic by convention; the default SOAR
/// playbooks match on it.
pub const LABEL_SHADOW_AI: &str = "shadow_ai";

/// A classifier verdict for one flow.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowClassification {
    /// Model label, e.g. `shadow_ai`.
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Supervised model plugged into the analyzer.
pub trait TrafficClassifier: Send + Sync {
    /// Classify one flow; `None` means the model has no opinion.
    fn classify(&self, event: &FlowEvent) -> Option<FlowClassification>;
}
