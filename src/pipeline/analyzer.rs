use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use super::services::CoreServices;
use crate::alerts::{Alert, Severity};
use crate::broker::{
    BrokerError, BusMessage, FlowPayload, HandlerError, TOPIC_ALERTS, TOPIC_TRAFFIC, TopicHandler,
};
use crate::flow::FlowEvent;
use crate::graph::{EdgeProps, NodeProps, NodeType, RELATION_TALKS_TO};
use crate::quarantine::CRITICAL_THRESHOLD;

/// How often the processed-event counter is logged.
const PROGRESS_INTERVAL: u64 = 10;

/// Errors from processing a single flow. These never escape the broker
/// handler; they are logged and the next event proceeds.
#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    /// The payload could not be normalized into a flow event.
    #[error("malformed flow payload: {0}")]
    #[diagnostic(code(shadowscope::pipeline::malformed))]
    Malformed(#[source] serde_json::Error),

    /// The broker refused an alert publish.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Broker(#[from] BrokerError),
}

/// The end-to-end flow-processing pipeline.
///
/// Subscribes to `telemetry.traffic` and, for each event: normalizes,
/// applies the privacy capture gate, classifies both endpoints, enriches
/// identity, merges the communication graph, scans payloads for DLP
/// violations, runs anomaly detection, and hands resulting alerts to the
/// store, the `alerts` topic, and the SOAR engine. Steps for one event run
/// sequentially; distinct events may be processed concurrently because every
/// shared store is internally synchronized.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use shadowscope::broker::MemoryBroker;
/// use shadowscope::config::CoreConfig;
/// use shadowscope::pipeline::{AnalyzerPipeline, CoreServices};
///
/// # async fn example() -> miette::Result<()> {
/// let broker = Arc::new(MemoryBroker::new());
/// let services = Arc::new(CoreServices::new(CoreConfig::from_env(), broker)?);
/// let pipeline = AnalyzerPipeline::new(Arc::clone(&services));
/// pipeline.start().await?;
/// // ... producers publish to telemetry.traffic ...
/// pipeline.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct AnalyzerPipeline {
    services: Arc<CoreServices>,
    processed: AtomicU64,
}

impl AnalyzerPipeline {
    pub fn new(services: Arc<CoreServices>) -> Arc<Self> {
        Arc::new(Self {
            services,
            processed: AtomicU64::new(0),
        })
    }

    /// Subscribe to the traffic topic and start the broker.
    pub async fn start(self: &Arc<Self>) -> Result<(), BrokerError> {
        tracing::info!(target: "shadowscope::pipeline", "analyzer pipeline starting");
        self.services
            .broker
            .subscribe(TOPIC_TRAFFIC, Arc::clone(self) as Arc<dyn TopicHandler>)
            .await?;
        self.services.broker.start().await
    }

    /// Stop processing: the broker drains in-flight dispatch with a deadline
    /// and stops its topic workers, which cancels this pipeline's
    /// subscription deliveries.
    pub async fn shutdown(&self) -> Result<(), BrokerError> {
        let result = self.services.broker.stop().await;
        tracing::info!(
            target: "shadowscope::pipeline",
            processed = self.processed.load(Ordering::Relaxed),
            "analyzer pipeline stopped"
        );
        result
    }

    /// Number of events fully processed so far.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Process one flow payload through the full pipeline, returning the
    /// enriched copy of the event (or `None` when the privacy gate dropped
    /// it).
    ///
    /// Public so control planes and tests can inject events without going
    /// through broker timing.
    pub async fn handle_flow(&self, payload: FlowPayload) -> Result<Option<FlowEvent>, PipelineError> {
        let event = payload.into_event().map_err(PipelineError::Malformed)?;
        let services = &self.services;

        // Privacy gate: in privacy mode, non-corporate destinations are
        // dropped before any state is touched.
        if !services
            .domains
            .should_capture(&event.destination_ip, &event.metadata)
        {
            tracing::trace!(
                target: "shadowscope::pipeline",
                destination = %event.destination_ip,
                "privacy mode: destination not captured"
            );
            return Ok(None);
        }

        let mut event = event;
        let src_id = event.source_ip.clone();
        let dst_ip = event.destination_ip.clone();
        let host = event.observed_host().map(str::to_owned);

        // Classify endpoints. The destination node id collapses to the DPI
        // hostname when one is present, so CDN-fronted services merge into a
        // single graph node; the original address is kept on the edge.
        let (src_label, src_type) = self.classify_internal_endpoint(&src_id);
        let (mut dst_id, mut dst_label, mut dst_type) = {
            let (label, node_type) = self.classify_internal_endpoint(&dst_ip);
            (dst_ip.clone(), label, node_type)
        };
        if let Some(host) = host.as_deref() {
            dst_id = host.to_string();
            dst_label = host.to_string();
            if services.domains.is_ai_domain(host) {
                dst_type = NodeType::Shadow;
            } else if !services.domains.is_internal(host) {
                dst_type = NodeType::External;
            }
        }

        // Identity enrichment for downstream consumers; the graph node keeps
        // only label, type, and last_seen.
        if let Some(profile) = services.identity.resolve(&src_id) {
            event.user_id = Some(profile.user_id.clone());
            event.user_name = Some(profile.user_name.clone());
            event.department = Some(profile.department.clone());
        }
        event.quarantine_status = services
            .quarantine
            .status(&src_id)
            .map(|record| record.status);

        // Merge the communication graph.
        services.graph.add_node(
            &src_id,
            ["Node"],
            NodeProps {
                label: src_label,
                node_type: src_type,
                last_seen: event.timestamp,
            },
        );
        services.graph.add_node(
            &dst_id,
            ["Node"],
            NodeProps {
                label: dst_label.clone(),
                node_type: dst_type,
                last_seen: event.timestamp,
            },
        );
        let peer_ip = (dst_id != dst_ip).then(|| dst_ip.clone());
        services.graph.add_edge(
            &src_id,
            &dst_id,
            RELATION_TALKS_TO,
            EdgeProps {
                protocol: event.protocol,
                dst_port: event.destination_port,
                byte_count: event.byte_count(),
                last_seen: event.timestamp,
                peer_ip,
            },
        );

        // Alerts raised for this event, tagged with the rule label the
        // technique mapper keys on.
        let mut raised: Vec<(&str, Alert)> = Vec::new();

        // DLP scan of the payload sample.
        if let Some(sample) = event.payload_sample.clone()
            && !sample.is_empty()
        {
            let matches = services.dlp.scan(&sample);
            if !matches.is_empty() {
                event.dlp_violation = true;
                event.dlp_snippets = matches.clone();
                let severity = matches
                    .iter()
                    .map(|m| m.severity)
                    .max()
                    .unwrap_or(Severity::High);
                let mut rule_names: Vec<&str> =
                    matches.iter().map(|m| m.rule_name.as_str()).collect();
                rule_names.dedup();
                let alert = Alert::new(
                    severity,
                    format!("DLP Violation ({}) from {src_id}", rule_names.join(", ")),
                    &src_id,
                    &dst_label,
                    event.timestamp,
                )
                .with_dlp_snippets(matches);
                raised.push(("DLP Violation", alert));
            }
        }

        // Anomaly detection.
        if let Some(detection) = services.detector.detect(&event) {
            let mut alert = Alert::new(
                detection.severity,
                detection.reason,
                &src_id,
                &dst_label,
                event.timestamp,
            );
            if let Some(classifier) = &services.classifier
                && let Some(verdict) = classifier.classify(&event)
            {
                if verdict.confidence >= CRITICAL_THRESHOLD {
                    let reason = format!(
                        "Classifier verdict {} at {:.0}% confidence",
                        verdict.label,
                        verdict.confidence * 100.0
                    );
                    if let Err(err) = services.quarantine.auto_quarantine_if_critical(
                        &src_id,
                        verdict.confidence,
                        &reason,
                    ) {
                        tracing::error!(
                            target: "shadowscope::pipeline",
                            ip = %src_id,
                            error = %err,
                            "auto-quarantine failed"
                        );
                    }
                }
                alert = alert.with_classification(verdict.label, verdict.confidence);
            }
            raised.push((detection.rule, alert));
        }

        for (rule, mut alert) in raised {
            alert.technique = services.mitre.map_alert(rule, &alert.description);
            tracing::warn!(
                target: "shadowscope::pipeline",
                alert_id = %alert.id,
                severity = %alert.severity,
                source = %alert.source,
                target = %alert.target,
                description = %alert.description,
                "alert raised"
            );
            services.alerts.add(alert.clone());
            if let Err(err) = services
                .broker
                .publish(TOPIC_ALERTS, BusMessage::Alert(alert.clone()))
                .await
            {
                tracing::warn!(
                    target: "shadowscope::pipeline",
                    error = %err,
                    "failed to publish alert"
                );
            }
            services.soar.evaluate(&alert).await;
        }

        let processed = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        if processed % PROGRESS_INTERVAL == 0 {
            tracing::info!(
                target: "shadowscope::pipeline",
                processed,
                "analyzer progress"
            );
        }
        Ok(Some(event))
    }

    /// Label and type for an endpoint that is not overridden by DPI metadata:
    /// infrastructure first, then RFC1918, else external.
    fn classify_internal_endpoint(&self, ip: &str) -> (String, NodeType) {
        if let Some(service) = self.services.identity.resolve_infra(ip) {
            return (service.to_string(), NodeType::Infra);
        }
        if self.services.domains.is_internal(ip) {
            (ip.to_string(), NodeType::Internal)
        } else {
            (ip.to_string(), NodeType::External)
        }
    }
}

#[async_trait]
impl TopicHandler for AnalyzerPipeline {
    async fn handle(&self, message: BusMessage) -> Result<(), HandlerError> {
        // All errors are absorbed here so one bad event can never break the
        // stream; the broker moves on to the next message regardless.
        match message {
            BusMessage::Flow(payload) => {
                if let Err(err) = self.handle_flow(payload).await {
                    tracing::warn!(
                        target: "shadowscope::pipeline",
                        error = %err,
                        "dropped flow event"
                    );
                }
            }
            BusMessage::Alert(_) => {
                tracing::warn!(
                    target: "shadowscope::pipeline",
                    "unexpected alert message on traffic topic; ignored"
                );
            }
        }
        Ok(())
    }

    fn name(&self) -> String {
        "analyzer-pipeline".to_string()
    }
}
