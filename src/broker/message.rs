use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::alerts::Alert;
use crate::flow::FlowEvent;

/// Topic carrying flow events from producers into the analyzer.
pub const TOPIC_TRAFFIC: &str = "telemetry.traffic";

/// Topic carrying alert records out of the analyzer.
pub const TOPIC_ALERTS: &str = "alerts";

/// Transport wrapper for flow telemetry.
///
/// Producers publish either a fully typed [`FlowEvent`] or a raw decoded map
/// (e.g. straight off a JSON wire). The pipeline normalizes once at the edge
/// via [`FlowPayload::into_event`] and propagates only typed events from
/// there on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlowPayload {
    Typed(FlowEvent),
    Raw(Map<String, Value>),
}

impl FlowPayload {
    /// Normalize to a typed event, parsing the raw map when necessary.
    pub fn into_event(self) -> Result<FlowEvent, serde_json::Error> {
        match self {
            FlowPayload::Typed(event) => Ok(event),
            FlowPayload::Raw(map) => serde_json::from_value(Value::Object(map)),
        }
    }
}

impl From<FlowEvent> for FlowPayload {
    fn from(event: FlowEvent) -> Self {
        FlowPayload::Typed(event)
    }
}

/// Message envelope moved through broker topics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum BusMessage {
    Flow(FlowPayload),
    Alert(Alert),
}

impl BusMessage {
    pub fn flow(event: FlowEvent) -> Self {
        BusMessage::Flow(FlowPayload::Typed(event))
    }

    pub fn alert(alert: Alert) -> Self {
        BusMessage::Alert(alert)
    }
}
