//! Identity resolution: internal IP → employee or infrastructure profile.
//!
//! In production this sits in front of a SCIM/LDAP sync; here the directory
//! is seeded statically and handed to the pipeline as a constructor
//! dependency. Lookups are O(1) except the subnet table, which is a short
//! linear scan over CIDR blocks.

use std::net::IpAddr;

use ipnet::IpNet;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Risk classification attached to an employee profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Standard,
    Elevated,
    Privileged,
}

/// Immutable employee identity record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmployeeProfile {
    pub user_id: String,
    pub user_name: String,
    pub department: String,
    pub role: String,
    pub email: String,
    pub risk_tier: RiskTier,
}

/// IP → identity lookups for enrichment.
pub struct IdentityResolver {
    employees: FxHashMap<String, EmployeeProfile>,
    infra: FxHashMap<String, String>,
    subnets: Vec<(IpNet, String)>,
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityResolver {
    /// Build the resolver with the seeded office directory.
    pub fn new() -> Self {
        let mut resolver = Self::empty();
        for (ip, user_id, user_name, department, role, email, risk_tier) in SEED_EMPLOYEES {
            resolver.insert_employee(
                *ip,
                EmployeeProfile {
                    user_id: (*user_id).to_string(),
                    user_name: (*user_name).to_string(),
                    department: (*department).to_string(),
                    role: (*role).to_string(),
                    email: (*email).to_string(),
                    risk_tier: *risk_tier,
                },
            );
        }
        for (ip, service) in SEED_INFRA {
            resolver.insert_infra(*ip, *service);
        }
        for (cidr, department) in SEED_SUBNETS {
            if let Ok(net) = cidr.parse::<IpNet>() {
                resolver.subnets.push((net, (*department).to_string()));
            }
        }
        resolver
    }

    /// An empty resolver, for tests or custom directories.
    pub fn empty() -> Self {
        Self {
            employees: FxHashMap::default(),
            infra: FxHashMap::default(),
            subnets: Vec::new(),
        }
    }

    pub fn insert_employee(&mut self, ip: impl Into<String>, profile: EmployeeProfile) {
        self.employees.insert(ip.into(), profile);
    }

    pub fn insert_infra(&mut self, ip: impl Into<String>, service: impl Into<String>) {
        self.infra.insert(ip.into(), service.into());
    }

    /// Resolve an internal IP to an employee profile. Unknown IPs (external
    /// or unregistered devices) return `None`.
    pub fn resolve(&self, ip: &str) -> Option<&EmployeeProfile> {
        self.employees.get(ip)
    }

    /// Resolve an infrastructure IP to its service name.
    pub fn resolve_infra(&self, ip: &str) -> Option<&str> {
        self.infra.get(ip).map(String::as_str)
    }

    /// Department for an IP: the subnet table first, direct employee lookup
    /// as the fallback.
    pub fn department_for_ip(&self, ip: &str) -> Option<&str> {
        if let Ok(addr) = ip.parse::<IpAddr>()
            && let Some((_, department)) = self.subnets.iter().find(|(net, _)| net.contains(&addr))
        {
            return Some(department.as_str());
        }
        self.resolve(ip).map(|profile| profile.department.as_str())
    }
}

type EmployeeSeed = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    RiskTier,
);

const SEED_EMPLOYEES: &[EmployeeSeed] = &[
    (
        "192.168.1.10",
        "EMP-001",
        "Ravi Sharma",
        "Engineering",
        "Senior Developer",
        "ravi.sharma@company.com",
        RiskTier::Standard,
    ),
    (
        "192.168.1.11",
        "EMP-002",
        "Priya Patel",
        "Design",
        "UI/UX Designer",
        "priya.patel@company.com",
        RiskTier::Standard,
    ),
    (
        "192.168.1.12",
        "EMP-003",
        "Arjun Mehta",
        "Management",
        "Engineering Manager",
        "arjun.mehta@company.com",
        RiskTier::Privileged,
    ),
    (
        "192.168.1.13",
        "EMP-004",
        "Meera Kapoor",
        "Data Science",
        "ML Engineer",
        "meera.kapoor@company.com",
        RiskTier::Elevated,
    ),
    (
        "192.168.1.14",
        "EMP-005",
        "Kiran Desai",
        "Engineering",
        "Software Intern",
        "kiran.desai@company.com",
        RiskTier::Standard,
    ),
];

const SEED_INFRA: &[(&str, &str)] = &[
    ("192.168.1.1", "Gateway Router"),
    ("192.168.1.100", "File Server"),
    ("192.168.1.101", "Git Server"),
    ("192.168.1.102", "Jira Server"),
    ("192.168.1.200", "Database Server"),
];

const SEED_SUBNETS: &[(&str, &str)] = &[
    ("192.168.1.0/26", "Engineering"),
    ("192.168.1.64/26", "Design & Product"),
    ("192.168.1.128/26", "Data Science"),
    ("192.168.1.192/26", "Management & Ops"),
];
