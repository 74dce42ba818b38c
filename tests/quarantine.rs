use std::sync::Arc;

use shadowscope::audit::AuditLedger;
use shadowscope::quarantine::{
    ACTION_QUARANTINE, ACTION_RELEASE, QuarantineRegistry, QuarantineRequest, QuarantineState,
    QuarantineStatus, ReleaseRequest, ReleaseStatus,
};

fn registry() -> (QuarantineRegistry, Arc<AuditLedger>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let audit = Arc::new(AuditLedger::open(dir.path().join("audit.jsonl")).unwrap());
    (QuarantineRegistry::new(Arc::clone(&audit)), audit, dir)
}

#[test]
fn quarantine_is_idempotent_with_one_record_and_one_audit_entry() {
    let (registry, audit, _dir) = registry();
    let req = QuarantineRequest::manual("192.168.1.14", "Suspicious beaconing");

    assert_eq!(
        registry.quarantine(&req).unwrap(),
        QuarantineStatus::Quarantined
    );
    assert_eq!(
        registry.quarantine(&req).unwrap(),
        QuarantineStatus::AlreadyQuarantined
    );

    let listing = registry.list();
    assert_eq!(listing.active.len(), 1);
    assert!(listing.released.is_empty());

    let quarantine_entries: Vec<_> = audit
        .get_logs(10)
        .into_iter()
        .filter(|entry| entry.action == ACTION_QUARANTINE && entry.resource == "192.168.1.14")
        .collect();
    assert_eq!(quarantine_entries.len(), 1);
}

#[test]
fn release_transitions_and_statuses() {
    let (registry, audit, _dir) = registry();

    let release = ReleaseRequest {
        ip: "10.0.0.9".to_string(),
        released_by: "analyst-7".to_string(),
    };
    assert_eq!(registry.release(&release).unwrap(), ReleaseStatus::NotFound);

    registry
        .quarantine(&QuarantineRequest::manual("10.0.0.9", "test"))
        .unwrap();
    assert!(registry.is_quarantined("10.0.0.9"));

    assert_eq!(registry.release(&release).unwrap(), ReleaseStatus::Released);
    assert!(!registry.is_quarantined("10.0.0.9"));
    assert_eq!(
        registry.release(&release).unwrap(),
        ReleaseStatus::AlreadyReleased
    );

    let record = registry.status("10.0.0.9").unwrap();
    assert_eq!(record.status, QuarantineState::Released);
    assert!(record.released_at.is_some());

    let release_entries: Vec<_> = audit
        .get_logs(10)
        .into_iter()
        .filter(|entry| entry.action == ACTION_RELEASE)
        .collect();
    assert_eq!(release_entries.len(), 1);
    assert_eq!(release_entries[0].actor, "analyst-7");
}

#[test]
fn requarantine_creates_a_fresh_record() {
    let (registry, audit, _dir) = registry();
    let ip = "192.168.1.13";

    registry
        .quarantine(&QuarantineRequest::manual(ip, "first incident"))
        .unwrap();
    registry
        .release(&ReleaseRequest {
            ip: ip.to_string(),
            released_by: "security-analyst".to_string(),
        })
        .unwrap();
    registry
        .quarantine(&QuarantineRequest::manual(ip, "second incident"))
        .unwrap();

    // Two records: one released, one active. The released one is history,
    // never re-activated.
    let listing = registry.list();
    assert_eq!(listing.active.len(), 1);
    assert_eq!(listing.released.len(), 1);
    assert_eq!(listing.active[0].reason, "second incident");
    assert_eq!(listing.released[0].reason, "first incident");

    // Three audit entries overall: quarantine, release, quarantine.
    assert_eq!(audit.len(), 3);
}

#[test]
fn auto_quarantine_respects_threshold_and_active_state() {
    let (registry, _audit, _dir) = registry();
    let ip = "192.168.1.10";

    assert!(!registry.auto_quarantine_if_critical(ip, 0.85, "below").unwrap());
    assert!(!registry.is_quarantined(ip));

    assert!(registry.auto_quarantine_if_critical(ip, 0.97, "model verdict").unwrap());
    assert!(registry.is_quarantined(ip));
    let record = registry.status(ip).unwrap();
    assert!(record.auto_triggered);
    assert_eq!(record.threat_score, Some(0.97));

    // Already active: no new record even above threshold.
    assert!(!registry.auto_quarantine_if_critical(ip, 0.99, "again").unwrap());
    assert_eq!(registry.list().active.len(), 1);
}

#[test]
fn audit_entry_marks_automated_triggers() {
    let (registry, audit, _dir) = registry();
    registry
        .quarantine(&QuarantineRequest {
            ip: "192.168.1.14".to_string(),
            reason: "critical alert".to_string(),
            threat_score: Some(1.0),
            auto: true,
        })
        .unwrap();

    let entry = &audit.get_logs(1)[0];
    assert_eq!(entry.action, ACTION_QUARANTINE);
    assert_eq!(entry.actor, "automation-pipeline");
    assert_eq!(
        entry.details.get("trigger"),
        Some(&serde_json::json!("AUTO"))
    );
}

#[test]
fn is_quarantined_only_counts_active_records() {
    let (registry, _audit, _dir) = registry();
    assert!(!registry.is_quarantined("1.2.3.4"));

    registry
        .quarantine(&QuarantineRequest::manual("1.2.3.4", "test"))
        .unwrap();
    assert!(registry.is_quarantined("1.2.3.4"));

    registry
        .release(&ReleaseRequest {
            ip: "1.2.3.4".to_string(),
            released_by: "security-analyst".to_string(),
        })
        .unwrap();
    assert!(!registry.is_quarantined("1.2.3.4"));
}
