use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::types::{
    EdgeKey, EdgeProps, GraphEdge, GraphNode, LABEL_UNKNOWN, NodeProps, NodeType,
};

/// Live directed multigraph of observed communication.
///
/// Nodes and edges are owned by the store and referenced by string id; there
/// are no back-pointers from edges to nodes, so ownership stays acyclic. All
/// operations are atomic per call and safe under concurrent writers. The
/// store is in-memory only.
///
/// Merge semantics:
/// - `add_node` on an existing id unions the label set, replaces scalar
///   attributes, takes `last_seen` as the max, and moves `type` only along
///   the `external → shadow` lattice.
/// - `add_edge` on an existing (source, target, relation) sums `byte_count`,
///   takes `last_seen` as the max, and overwrites other scalars.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use shadowscope::graph::{GraphStore, NodeProps, NodeType};
///
/// let graph = GraphStore::new();
/// graph.add_node("192.168.1.10", ["Node"], NodeProps {
///     label: "192.168.1.10".into(),
///     node_type: NodeType::Internal,
///     last_seen: Utc::now(),
/// });
/// assert_eq!(graph.node_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct GraphStore {
    inner: RwLock<GraphInner>,
}

#[derive(Debug, Default)]
struct GraphInner {
    nodes: FxHashMap<String, GraphNode>,
    edges: FxHashMap<EdgeKey, GraphEdge>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or merge a node.
    pub fn add_node<I, S>(&self, id: &str, labels: I, props: NodeProps)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inner = self.inner.write();
        Self::merge_node(&mut inner, id, labels, props);
    }

    /// Create or merge a directed edge. Missing endpoints are created with a
    /// placeholder `Unknown` label so the edge always has both ends.
    pub fn add_edge(&self, source: &str, target: &str, relation: &str, props: EdgeProps) {
        let mut inner = self.inner.write();
        for endpoint in [source, target] {
            if !inner.nodes.contains_key(endpoint) {
                Self::merge_node(
                    &mut inner,
                    endpoint,
                    [LABEL_UNKNOWN],
                    NodeProps {
                        label: endpoint.to_string(),
                        node_type: NodeType::External,
                        last_seen: props.last_seen,
                    },
                );
            }
        }

        let key = EdgeKey {
            source: source.to_string(),
            target: target.to_string(),
            relation: relation.to_string(),
        };
        match inner.edges.get_mut(&key) {
            Some(edge) => {
                edge.protocol = props.protocol;
                edge.dst_port = props.dst_port;
                edge.byte_count = edge.byte_count.saturating_add(props.byte_count);
                edge.last_seen = edge.last_seen.max(props.last_seen);
                if props.peer_ip.is_some() {
                    edge.peer_ip = props.peer_ip;
                }
            }
            None => {
                inner.edges.insert(
                    key,
                    GraphEdge {
                        source: source.to_string(),
                        target: target.to_string(),
                        relation: relation.to_string(),
                        protocol: props.protocol,
                        dst_port: props.dst_port,
                        byte_count: props.byte_count,
                        last_seen: props.last_seen,
                        peer_ip: props.peer_ip,
                    },
                );
            }
        }
    }

    /// Snapshot of all nodes.
    pub fn get_all_nodes(&self) -> Vec<GraphNode> {
        self.inner.read().nodes.values().cloned().collect()
    }

    /// Snapshot of all edges.
    pub fn get_all_edges(&self) -> Vec<GraphEdge> {
        self.inner.read().edges.values().cloned().collect()
    }

    /// Snapshot of a single node by id.
    pub fn node(&self, id: &str) -> Option<GraphNode> {
        self.inner.read().nodes.get(id).cloned()
    }

    /// Snapshot of a single edge by key.
    pub fn edge(&self, source: &str, target: &str, relation: &str) -> Option<GraphEdge> {
        let key = EdgeKey {
            source: source.to_string(),
            target: target.to_string(),
            relation: relation.to_string(),
        };
        self.inner.read().edges.get(&key).cloned()
    }

    pub fn node_count(&self) -> usize {
        self.inner.read().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.read().edges.len()
    }

    fn merge_node<I, S>(inner: &mut GraphInner, id: &str, labels: I, props: NodeProps)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match inner.nodes.get_mut(id) {
            Some(node) => {
                node.labels.extend(labels.into_iter().map(Into::into));
                node.label = props.label;
                node.node_type = node.node_type.merge(props.node_type);
                node.last_seen = node.last_seen.max(props.last_seen);
            }
            None => {
                inner.nodes.insert(
                    id.to_string(),
                    GraphNode {
                        id: id.to_string(),
                        labels: labels.into_iter().map(Into::into).collect(),
                        label: props.label,
                        node_type: props.node_type,
                        last_seen: props.last_seen,
                    },
                );
            }
        }
    }
}
