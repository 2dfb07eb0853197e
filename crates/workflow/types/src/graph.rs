//! Graph index: constant-time lookup and adjacency over a definition
//!
//! The index is a pure view. It accepts any draft, including malformed
//! ones: duplicate ids resolve to their first declaration, and edges whose
//! endpoints do not exist are simply left out of the adjacency lists.

use crate::{NodeKind, WorkflowDefinition, WorkflowEdge, WorkflowNode};
use std::collections::HashMap;

/// Adjacency structure built once per definition
#[derive(Clone, Debug)]
pub struct GraphIndex<'a> {
    definition: &'a WorkflowDefinition,
    /// Node id -> position of its first declaration
    node_positions: HashMap<&'a str, usize>,
    /// Edge id -> position of its first declaration
    edge_positions: HashMap<&'a str, usize>,
    /// Node position -> outgoing edge positions, in edge declaration order
    outgoing: Vec<Vec<usize>>,
    /// Node position -> incoming edge positions, in edge declaration order
    incoming: Vec<Vec<usize>>,
    /// Kind -> node positions, in node declaration order
    by_kind: HashMap<NodeKind, Vec<usize>>,
}

impl<'a> GraphIndex<'a> {
    pub fn new(definition: &'a WorkflowDefinition) -> Self {
        let mut node_positions = HashMap::with_capacity(definition.nodes.len());
        let mut by_kind: HashMap<NodeKind, Vec<usize>> = HashMap::new();
        for (position, node) in definition.nodes.iter().enumerate() {
            if !node_positions.contains_key(node.id.as_str()) {
                node_positions.insert(node.id.as_str(), position);
                by_kind.entry(node.kind).or_default().push(position);
            }
        }

        let mut edge_positions = HashMap::with_capacity(definition.edges.len());
        let mut outgoing = vec![Vec::new(); definition.nodes.len()];
        let mut incoming = vec![Vec::new(); definition.nodes.len()];
        for (position, edge) in definition.edges.iter().enumerate() {
            edge_positions.entry(edge.id.as_str()).or_insert(position);
            let source = node_positions.get(edge.source.as_str()).copied();
            let target = node_positions.get(edge.target.as_str()).copied();
            if let (Some(source), Some(target)) = (source, target) {
                outgoing[source].push(position);
                incoming[target].push(position);
            }
        }

        Self {
            definition,
            node_positions,
            edge_positions,
            outgoing,
            incoming,
            by_kind,
        }
    }

    pub fn definition(&self) -> &'a WorkflowDefinition {
        self.definition
    }

    /// Look up a node by id
    pub fn node(&self, node_id: &str) -> Option<&'a WorkflowNode> {
        self.position(node_id).map(|p| &self.definition.nodes[p])
    }

    /// Look up an edge by id
    pub fn edge(&self, edge_id: &str) -> Option<&'a WorkflowEdge> {
        self.edge_positions
            .get(edge_id)
            .map(|&p| &self.definition.edges[p])
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.node_positions.contains_key(node_id)
    }

    /// Position of the first node declared with this id
    pub fn position(&self, node_id: &str) -> Option<usize> {
        self.node_positions.get(node_id).copied()
    }

    /// Whether the node at `position` is the first declaration of its id
    pub fn is_canonical(&self, position: usize) -> bool {
        self.definition
            .nodes
            .get(position)
            .and_then(|node| self.position(node.id.as_str()))
            == Some(position)
    }

    /// Outgoing edges of a node whose endpoints both exist
    pub fn outgoing_edges(&self, node_id: &str) -> Vec<&'a WorkflowEdge> {
        self.position(node_id)
            .map(|p| self.edges_at(&self.outgoing[p]))
            .unwrap_or_default()
    }

    /// Incoming edges of a node whose endpoints both exist
    pub fn incoming_edges(&self, node_id: &str) -> Vec<&'a WorkflowEdge> {
        self.position(node_id)
            .map(|p| self.edges_at(&self.incoming[p]))
            .unwrap_or_default()
    }

    /// Nodes of one kind, in declaration order
    pub fn nodes_by_kind(&self, kind: NodeKind) -> Vec<&'a WorkflowNode> {
        self.by_kind
            .get(&kind)
            .map(|positions| {
                positions
                    .iter()
                    .map(|&p| &self.definition.nodes[p])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Node positions of one kind, in declaration order
    pub fn positions_by_kind(&self, kind: NodeKind) -> &[usize] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Positions of the successor nodes of the node at `position`
    pub fn successor_positions(&self, position: usize) -> Vec<usize> {
        self.outgoing[position]
            .iter()
            .filter_map(|&e| self.position(self.definition.edges[e].target.as_str()))
            .collect()
    }

    /// Positions of the predecessor nodes of the node at `position`
    pub fn predecessor_positions(&self, position: usize) -> Vec<usize> {
        self.incoming[position]
            .iter()
            .filter_map(|&e| self.position(self.definition.edges[e].source.as_str()))
            .collect()
    }

    /// Number of outgoing edges with existing endpoints
    pub fn out_degree(&self, position: usize) -> usize {
        self.outgoing[position].len()
    }

    pub fn node_count(&self) -> usize {
        self.definition.nodes.len()
    }

    fn edges_at(&self, positions: &[usize]) -> Vec<&'a WorkflowEdge> {
        positions
            .iter()
            .map(|&p| &self.definition.edges[p])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NodeId, WorkflowEdge};

    fn make_branching_workflow() -> WorkflowDefinition {
        let mut wf = WorkflowDefinition::new("branch", "Branching", 1)
            .with_node(WorkflowNode::start("start"))
            .with_node(WorkflowNode::review("review", "Review"))
            .with_node(WorkflowNode::end("accepted"))
            .with_node(WorkflowNode::end("rejected"));
        wf.connect("start", "review");
        wf.add_edge(WorkflowEdge::conditional("ok", "review", "accepted", "approved"));
        wf.add_edge(WorkflowEdge::conditional("no", "review", "rejected", "denied"));
        wf
    }

    #[test]
    fn test_lookup_and_neighbours() {
        let wf = make_branching_workflow();
        let graph = wf.graph();

        assert_eq!(graph.node("review").unwrap().label, "Review");
        assert!(graph.node("missing").is_none());
        assert_eq!(graph.edge("ok").unwrap().target, NodeId::new("accepted"));

        let out = graph.outgoing_edges("review");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id.as_str(), "ok");
        assert_eq!(out[1].id.as_str(), "no");

        let incoming = graph.incoming_edges("review");
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].source, NodeId::new("start"));
        assert!(graph.outgoing_edges("missing").is_empty());
    }

    #[test]
    fn test_nodes_by_kind() {
        let wf = make_branching_workflow();
        let graph = wf.graph();
        let ends: Vec<_> = graph
            .nodes_by_kind(NodeKind::End)
            .into_iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ends, vec!["accepted", "rejected"]);
        assert!(graph.nodes_by_kind(NodeKind::Audit).is_empty());
    }

    #[test]
    fn test_malformed_input_is_indexed_not_rejected() {
        let mut wf = WorkflowDefinition::new("bad", "Bad", 1)
            .with_node(WorkflowNode::start("a"))
            .with_node(WorkflowNode::end("a"));
        wf.connect("a", "ghost");

        let graph = wf.graph();
        assert_eq!(graph.node("a").unwrap().kind, NodeKind::Start);
        assert!(graph.is_canonical(0));
        assert!(!graph.is_canonical(1));
        assert!(graph.outgoing_edges("a").is_empty());
        assert_eq!(graph.out_degree(0), 0);
    }

    #[test]
    fn test_successor_positions() {
        let wf = make_branching_workflow();
        let graph = wf.graph();
        let review = graph.position("review").unwrap();
        assert_eq!(graph.successor_positions(review), vec![2, 3]);
        assert_eq!(graph.predecessor_positions(review), vec![0]);
    }
}
