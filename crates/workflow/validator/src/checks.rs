//! Structural checks: node counts, identifiers, and edge endpoints

use crate::Violation;
use std::collections::HashSet;
use workflow_types::{GraphIndex, NodeKind};

pub(crate) fn check_node_counts(graph: &GraphIndex<'_>, out: &mut Vec<Violation>) {
    let definition = graph.definition();
    if definition.nodes.len() < 2 {
        out.push(Violation::TooFewNodes {
            count: definition.nodes.len(),
        });
    }

    let starts = graph.nodes_by_kind(NodeKind::Start);
    match starts.len() {
        0 => out.push(Violation::MissingStart),
        1 => {}
        _ => out.push(Violation::MultipleStart {
            node_ids: starts.iter().map(|n| n.id.clone()).collect(),
        }),
    }

    if graph.positions_by_kind(NodeKind::End).is_empty() {
        out.push(Violation::MissingEnd);
    }
}

pub(crate) fn check_duplicate_ids(graph: &GraphIndex<'_>, out: &mut Vec<Violation>) {
    let definition = graph.definition();

    let mut reported = HashSet::new();
    for (position, node) in definition.nodes.iter().enumerate() {
        if !graph.is_canonical(position) && reported.insert(node.id.as_str()) {
            out.push(Violation::DuplicateNodeId {
                node_id: node.id.clone(),
            });
        }
    }

    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for edge in &definition.edges {
        if !seen.insert(edge.id.as_str()) && reported.insert(edge.id.as_str()) {
            out.push(Violation::DuplicateEdgeId {
                edge_id: edge.id.clone(),
            });
        }
    }
}

pub(crate) fn check_edges(graph: &GraphIndex<'_>, out: &mut Vec<Violation>) {
    for edge in &graph.definition().edges {
        for endpoint in [&edge.source, &edge.target] {
            if !graph.contains_node(endpoint.as_str()) {
                out.push(Violation::DanglingEdge {
                    edge_id: edge.id.clone(),
                    node_id: endpoint.clone(),
                });
            }
            if edge.is_self_loop() {
                break;
            }
        }
    }

    for edge in &graph.definition().edges {
        if edge.is_self_loop() {
            out.push(Violation::SelfLoop {
                edge_id: edge.id.clone(),
                node_id: edge.source.clone(),
            });
        }
    }
}

pub(crate) fn check_sla(graph: &GraphIndex<'_>, out: &mut Vec<Violation>) {
    for (position, node) in graph.definition().nodes.iter().enumerate() {
        if graph.is_canonical(position) && node.sla_hours == 0 {
            out.push(Violation::InvalidSla {
                node_id: node.id.clone(),
            });
        }
    }
}
