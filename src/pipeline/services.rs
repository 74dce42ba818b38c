use std::sync::Arc;

use crate::alerts::{Alert, AlertStore};
use crate::audit::{AuditEntry, AuditError, AuditLedger};
use crate::broker::EventBroker;
use crate::classifier::TrafficClassifier;
use crate::config::CoreConfig;
use crate::detect::AnomalyDetector;
use crate::dlp::DlpScanner;
use crate::domains::DomainClassifier;
use crate::graph::{GraphEdge, GraphNode, GraphStore};
use crate::identity::IdentityResolver;
use crate::mitre::{TechniqueMapper, TechniqueTag};
use crate::quarantine::{
    QuarantineError, QuarantineListing, QuarantineRecord, QuarantineRegistry, QuarantineRequest,
    QuarantineStatus, ReleaseRequest, ReleaseStatus,
};
use crate::soar::{Enforcer, SoarEngine};

/// Shared service container wiring every core component together.
///
/// What the original design kept as module-level singletons (audit ledger,
/// DLP engine, SOAR engine, alert store) are explicit constructor
/// dependencies here; one `CoreServices` per deployment is the expected
/// shape. The struct also exposes the read/write surface the external
/// HTTP/WebSocket control plane consumes.
pub struct CoreServices {
    pub config: CoreConfig,
    pub broker: Arc<dyn EventBroker>,
    pub graph: Arc<GraphStore>,
    pub audit: Arc<AuditLedger>,
    pub quarantine: Arc<QuarantineRegistry>,
    pub alerts: Arc<AlertStore>,
    pub identity: Arc<IdentityResolver>,
    pub domains: Arc<DomainClassifier>,
    pub dlp: Arc<DlpScanner>,
    pub detector: AnomalyDetector,
    pub mitre: TechniqueMapper,
    pub soar: SoarEngine,
    pub classifier: Option<Arc<dyn TrafficClassifier>>,
}

impl CoreServices {
    /// Assemble the core on top of a broker. Fails only if the audit ledger
    /// cannot be opened at its configured path.
    pub fn new(config: CoreConfig, broker: Arc<dyn EventBroker>) -> Result<Self, AuditError> {
        let audit = Arc::new(AuditLedger::open(&config.audit_log_path)?);
        let quarantine = Arc::new(QuarantineRegistry::new(Arc::clone(&audit)));
        let domains = Arc::new(DomainClassifier::new(&config));
        let detector = AnomalyDetector::new(Arc::clone(&domains));
        let soar = SoarEngine::new(Arc::clone(&quarantine) as Arc<dyn Enforcer>);
        Ok(Self {
            config,
            broker,
            graph: Arc::new(GraphStore::new()),
            audit,
            quarantine,
            alerts: Arc::new(AlertStore::new()),
            identity: Arc::new(IdentityResolver::new()),
            domains,
            dlp: Arc::new(DlpScanner::new()),
            detector,
            mitre: TechniqueMapper::new(),
            soar,
            classifier: None,
        })
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn TrafficClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    // ── Control-plane surface ──────────────────────────────────────────

    pub fn list_nodes(&self) -> Vec<GraphNode> {
        self.graph.get_all_nodes()
    }

    pub fn list_edges(&self) -> Vec<GraphEdge> {
        self.graph.get_all_edges()
    }

    pub fn list_alerts(&self) -> Vec<Alert> {
        self.alerts.list()
    }

    pub fn add_alert(&self, alert: Alert) {
        self.alerts.add(alert);
    }

    pub fn quarantine(&self, req: &QuarantineRequest) -> Result<QuarantineStatus, QuarantineError> {
        self.quarantine.quarantine(req)
    }

    pub fn release(&self, req: &ReleaseRequest) -> Result<ReleaseStatus, QuarantineError> {
        self.quarantine.release(req)
    }

    pub fn list_quarantined(&self) -> QuarantineListing {
        self.quarantine.list()
    }

    pub fn quarantine_status(&self, ip: &str) -> Option<QuarantineRecord> {
        self.quarantine.status(ip)
    }

    pub fn get_audit_log(&self, limit: usize) -> Vec<AuditEntry> {
        self.audit.get_logs(limit)
    }

    pub fn map_alert(&self, rule_name: &str, description: &str) -> Option<TechniqueTag> {
        self.mitre.map_alert(rule_name, description)
    }
}
