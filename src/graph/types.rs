use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::flow::Protocol;

/// Relation tag used for flow traffic edges.
pub const RELATION_TALKS_TO: &str = "TALKS_TO";

/// Label given to endpoints materialized by an edge before any classification
/// has been observed for them.
pub const LABEL_UNKNOWN: &str = "Unknown";

/// Classification of a graph node.
///
/// The type may only move up the `external → shadow` lattice: an external
/// service is upgraded to `shadow` once it is recognized as a generative-AI
/// endpoint, and `internal`/`infra` nodes never change class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Internal,
    External,
    Shadow,
    Infra,
}

impl NodeType {
    /// Merge an incoming classification into the current one under the
    /// lattice rules.
    pub(crate) fn merge(self, incoming: NodeType) -> NodeType {
        match (self, incoming) {
            (NodeType::External, NodeType::Shadow) => NodeType::Shadow,
            _ => self,
        }
    }
}

/// Scalar attributes supplied with an `add_node` call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeProps {
    /// Human-readable label, usually the IP or hostname.
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub last_seen: DateTime<Utc>,
}

/// A node in the live communication graph.
///
/// Identity is the string `id`: the internal IP for internal hosts, the
/// canonical hostname when DPI metadata yields one, else the external IP.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub labels: BTreeSet<String>,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub last_seen: DateTime<Utc>,
}

/// Key of a directed edge; one edge exists per (source, target, relation).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    pub source: String,
    pub target: String,
    pub relation: String,
}

/// Scalar attributes supplied with an `add_edge` call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeProps {
    pub protocol: Protocol,
    pub dst_port: u16,
    /// Bytes carried by the flow being merged; accumulated on the edge.
    pub byte_count: u64,
    pub last_seen: DateTime<Utc>,
    /// Original destination IP when the target node id collapsed to a
    /// hostname, so the address is not lost to the visualization choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_ip: Option<String>,
}

/// A directed edge in the live communication graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub relation: String,
    pub protocol: Protocol,
    pub dst_port: u16,
    /// Cumulative byte count over every merged flow. Monotonic.
    pub byte_count: u64,
    pub last_seen: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_ip: Option<String>,
}
