//! The analyzer pipeline orchestrating every core component end to end.
//!
//! [`CoreServices`] wires the broker, stores, and analytics stages together;
//! [`AnalyzerPipeline`] subscribes to the traffic topic and drives each
//! incoming event through enrichment, graph merge, DLP, detection, and
//! response.

pub mod analyzer;
pub mod services;

pub use analyzer::{AnalyzerPipeline, PipelineError};
pub use services::CoreServices;
