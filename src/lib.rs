//! # Shadowscope: Shadow-AI & Data-Exfiltration Detection Core
//!
//! Shadowscope is the streaming analytics core of a shadow-AI detection
//! platform for corporate networks. It ingests network flow telemetry over an
//! in-process broker, enriches each flow with identity and destination
//! classification, maintains a live directed graph of who talks to whom,
//! scans payload samples for sensitive-data leaks, detects anomalous and
//! shadow-AI behavior, maps findings onto the MITRE ATT&CK taxonomy, and can
//! quarantine offending endpoints through a playbook engine, with every
//! administrative action written to a tamper-evident audit ledger.
//!
//! ## Core Concepts
//!
//! - **Flow events**: one record per observed (source, destination, protocol,
//!   bytes, metadata) communication
//! - **Broker**: topic-keyed pub/sub with per-subscriber publish ordering
//! - **Graph**: merge-on-write multigraph of hosts and services
//! - **Detection**: deterministic rules plus an optional classifier contract
//! - **Response**: SOAR playbooks executing through an enforcer capability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use shadowscope::broker::{BusMessage, EventBroker, MemoryBroker, TOPIC_TRAFFIC};
//! use shadowscope::config::CoreConfig;
//! use shadowscope::flow::{FlowEvent, Protocol};
//! use shadowscope::pipeline::{AnalyzerPipeline, CoreServices};
//!
//! # async fn example() -> miette::Result<()> {
//! shadowscope::telemetry::init();
//!
//! let broker = Arc::new(MemoryBroker::new());
//! let services = Arc::new(CoreServices::new(
//!     CoreConfig::from_env(),
//!     Arc::clone(&broker) as Arc<dyn EventBroker>,
//! )?);
//!
//! let pipeline = AnalyzerPipeline::new(Arc::clone(&services));
//! pipeline.start().await?;
//!
//! // A producer (sniffer, simulator, ...) publishes flow events:
//! let event = FlowEvent::new("192.168.1.10", 51234, "1.2.3.4", 443, Protocol::Https)
//!     .with_metadata("host", "chatgpt.com");
//! broker.publish(TOPIC_TRAFFIC, BusMessage::flow(event)).await?;
//!
//! // ...and the control plane reads the resulting state:
//! let _nodes = services.list_nodes();
//! let _alerts = services.list_alerts();
//!
//! pipeline.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Guide
//!
//! - [`broker`] - In-process pub/sub for flow events and alerts
//! - [`flow`] - Flow event model and protocol labels
//! - [`graph`] - Live communication graph store
//! - [`audit`] - Append-only, crash-safe audit ledger
//! - [`quarantine`] - Advisory isolation registry
//! - [`identity`] - IP → employee/infrastructure resolution
//! - [`domains`] - AI/SaaS/personal destination classification
//! - [`dlp`] - Sensitive-data scanning with redaction
//! - [`detect`] - Rule-based anomaly detection
//! - [`mitre`] - Alert → ATT&CK tactic/technique mapping
//! - [`alerts`] - Alert records and the bounded alert store
//! - [`soar`] - Playbook-driven automated response
//! - [`classifier`] - Contract for an optional supervised classifier
//! - [`pipeline`] - End-to-end orchestration of all of the above

pub mod alerts;
pub mod audit;
pub mod broker;
pub mod classifier;
pub mod config;
pub mod detect;
pub mod dlp;
pub mod domains;
pub mod flow;
pub mod graph;
pub mod identity;
pub mod mitre;
pub mod pipeline;
pub mod quarantine;
pub mod soar;
pub mod telemetry;
