//! Mapping of semantic alerts onto the MITRE ATT&CK taxonomy.

use serde::{Deserialize, Serialize};

/// Adversary tactic/technique tag attached to an alert.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechniqueTag {
    pub tactic: String,
    pub technique_id: String,
    pub technique_name: String,
}

/// Keyword → (tactic, technique id, technique name), checked in order; the
/// first keyword found as a substring wins.
const MAPPINGS: &[(&str, (&str, &str, &str))] = &[
    // Exfiltration
    (
        "dlp violation",
        ("Exfiltration", "T1048", "Exfiltration Over Alternative Protocol"),
    ),
    (
        "shadow ai",
        ("Exfiltration", "T1567", "Exfiltration Over Web Service"),
    ),
    (
        "significant data volume",
        ("Exfiltration", "T1041", "Exfiltration Over C2 Channel"),
    ),
    // Discovery
    (
        "graph centrality",
        ("Discovery", "T1046", "Network Service Discovery"),
    ),
    // Lateral movement
    (
        "lateral movement",
        ("Lateral Movement", "T1021", "Remote Services"),
    ),
    // Command and control
    (
        "beaconing",
        ("Command and Control", "T1071", "Application Layer Protocol"),
    ),
    (
        "suspicious traffic",
        ("Command and Control", "T1568", "Dynamic Resolution"),
    ),
    // Credential access
    ("brute force", ("Credential Access", "T1110", "Brute Force")),
    (
        "spoofing",
        ("Credential Access", "T1556", "Modify Authentication Process"),
    ),
];

/// Maps alert rule names and descriptions into ATT&CK tactics and techniques.
#[derive(Clone, Copy, Debug, Default)]
pub struct TechniqueMapper;

impl TechniqueMapper {
    pub fn new() -> Self {
        Self
    }

    /// Attempt to map an alert by substring search over its rule name and
    /// description. Anomalous-but-unmapped behavior falls back to generic
    /// command-and-control; anything else returns `None`.
    pub fn map_alert(&self, rule_name: &str, description: &str) -> Option<TechniqueTag> {
        let search_text = format!("{rule_name} {description}").to_lowercase();

        for (keyword, (tactic, technique_id, technique_name)) in MAPPINGS {
            if search_text.contains(keyword) {
                return Some(TechniqueTag {
                    tactic: (*tactic).to_string(),
                    technique_id: (*technique_id).to_string(),
                    technique_name: (*technique_name).to_string(),
                });
            }
        }

        if search_text.contains("anomaly") || search_text.contains("anomalous") {
            return Some(TechniqueTag {
                tactic: "Command and Control".to_string(),
                technique_id: "T1071".to_string(),
                technique_name: "Application Layer Protocol".to_string(),
            });
        }

        None
    }
}
