use std::any::type_name;

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use super::message::BusMessage;

/// Abstraction over a topic subscriber.
///
/// Handlers are invoked by the broker's per-topic dispatch worker, one message
/// at a time in publish order. A handler must not block the scheduler thread;
/// anything slow belongs behind `spawn_blocking`.
#[async_trait]
pub trait TopicHandler: Send + Sync {
    /// Process one message. Returning an error skips the message for this
    /// subscriber; the broker logs it and does not redeliver.
    async fn handle(&self, message: BusMessage) -> Result<(), HandlerError>;

    /// A stable, human-friendly identifier for this handler instance.
    ///
    /// Defaults to the concrete type name; implementors may override to
    /// provide shorter names or include configuration context.
    fn name(&self) -> String {
        type_name::<Self>().to_string()
    }
}

/// Errors a subscriber handler can surface to the broker.
#[derive(Debug, Error, Diagnostic)]
pub enum HandlerError {
    /// The payload could not be normalized into the expected shape.
    #[error("malformed payload: {0}")]
    #[diagnostic(code(shadowscope::broker::malformed_payload))]
    Malformed(String),

    /// JSON decoding failed while normalizing a raw payload.
    #[error(transparent)]
    #[diagnostic(code(shadowscope::broker::serde_json))]
    Serde(#[from] serde_json::Error),

    /// Any other handler-specific failure.
    #[error("{0}")]
    #[diagnostic(code(shadowscope::broker::handler))]
    Other(String),
}

impl HandlerError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}
