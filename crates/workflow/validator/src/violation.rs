//! Violations: the enumerable reasons a definition is rejected

use serde::{Deserialize, Serialize};
use workflow_types::{EdgeId, NodeId};

/// One specific defect found in a definition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    #[error("workflow needs at least 2 nodes, found {count}")]
    TooFewNodes { count: usize },

    #[error("workflow has no start node")]
    MissingStart,

    #[error("workflow has {} start nodes, expected exactly one", .node_ids.len())]
    MultipleStart { node_ids: Vec<NodeId> },

    #[error("workflow has no end node")]
    MissingEnd,

    #[error("duplicate node id: {node_id}")]
    DuplicateNodeId { node_id: NodeId },

    #[error("duplicate edge id: {edge_id}")]
    DuplicateEdgeId { edge_id: EdgeId },

    #[error("edge {edge_id} references unknown node {node_id}")]
    DanglingEdge { edge_id: EdgeId, node_id: NodeId },

    #[error("edge {edge_id} loops from {node_id} to itself")]
    SelfLoop { edge_id: EdgeId, node_id: NodeId },

    #[error("node {node_id} has an SLA of 0 hours")]
    InvalidSla { node_id: NodeId },

    #[error("node {node_id} is unreachable from the start node")]
    Unreachable { node_id: NodeId },

    #[error("node {node_id} has no outgoing edges and is not an end node")]
    DeadEnd { node_id: NodeId },

    #[error("edge {edge_id} closes a cycle {from} -> {to} from which no end node is reachable")]
    Cycle {
        edge_id: EdgeId,
        from: NodeId,
        to: NodeId,
    },
}

/// Discriminant of a [`Violation`], one per check
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    TooFewNodes,
    MissingStart,
    MultipleStart,
    MissingEnd,
    DuplicateNodeId,
    DuplicateEdgeId,
    DanglingEdge,
    SelfLoop,
    InvalidSla,
    Unreachable,
    DeadEnd,
    Cycle,
}

impl Violation {
    pub fn kind(&self) -> ViolationKind {
        match self {
            Violation::TooFewNodes { .. } => ViolationKind::TooFewNodes,
            Violation::MissingStart => ViolationKind::MissingStart,
            Violation::MultipleStart { .. } => ViolationKind::MultipleStart,
            Violation::MissingEnd => ViolationKind::MissingEnd,
            Violation::DuplicateNodeId { .. } => ViolationKind::DuplicateNodeId,
            Violation::DuplicateEdgeId { .. } => ViolationKind::DuplicateEdgeId,
            Violation::DanglingEdge { .. } => ViolationKind::DanglingEdge,
            Violation::SelfLoop { .. } => ViolationKind::SelfLoop,
            Violation::InvalidSla { .. } => ViolationKind::InvalidSla,
            Violation::Unreachable { .. } => ViolationKind::Unreachable,
            Violation::DeadEnd { .. } => ViolationKind::DeadEnd,
            Violation::Cycle { .. } => ViolationKind::Cycle,
        }
    }

    /// The node this violation is about, if it is about a single node
    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            Violation::DuplicateNodeId { node_id }
            | Violation::DanglingEdge { node_id, .. }
            | Violation::SelfLoop { node_id, .. }
            | Violation::InvalidSla { node_id }
            | Violation::Unreachable { node_id }
            | Violation::DeadEnd { node_id } => Some(node_id),
            _ => None,
        }
    }
}
