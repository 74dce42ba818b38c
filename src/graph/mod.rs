//! Live communication graph: nodes for hosts and services, directed edges for
//! observed flows.
//!
//! The store merges concurrent writes under an internal lock and exposes
//! snapshot reads for the control plane and visualization layers.

pub mod store;
pub mod types;

pub use store::GraphStore;
pub use types::{
    EdgeKey, EdgeProps, GraphEdge, GraphNode, LABEL_UNKNOWN, NodeProps, NodeType,
    RELATION_TALKS_TO,
};
