//! In-process pub/sub broker for flow telemetry and alerts.
//!
//! The module is organised around the [`EventBroker`] trait (so a durable
//! external broker can replace the local one in production) and the
//! [`MemoryBroker`] implementation: one unbounded queue and one dispatch
//! worker per topic, delivering to every subscriber in publish order.

pub mod bus;
pub mod handler;
pub mod message;

pub use bus::{BrokerError, EventBroker, MemoryBroker};
pub use handler::{HandlerError, TopicHandler};
pub use message::{BusMessage, FlowPayload, TOPIC_ALERTS, TOPIC_TRAFFIC};
