//! Flow checks: reachability, dead ends, and trapping cycles
//!
//! The adjacency lists are built once and shared by one forward BFS from
//! the start node, one reverse BFS from the end nodes, and one DFS, so the
//! whole pass is linear in nodes + edges.

use crate::Violation;
use std::collections::VecDeque;
use workflow_types::{GraphIndex, NodeKind, WorkflowEdge};

struct Adjacency<'a> {
    /// Canonical node position -> (edge, target position), self-loops excluded
    forward: Vec<Vec<(&'a WorkflowEdge, usize)>>,
    /// Canonical node position -> predecessor positions
    reverse: Vec<Vec<usize>>,
}

impl<'a> Adjacency<'a> {
    fn build(graph: &GraphIndex<'a>) -> Self {
        let nodes = &graph.definition().nodes;
        let mut forward = vec![Vec::new(); nodes.len()];
        let mut reverse = vec![Vec::new(); nodes.len()];

        for (position, node) in nodes.iter().enumerate() {
            if !graph.is_canonical(position) {
                continue;
            }
            for edge in graph.outgoing_edges(node.id.as_str()) {
                let Some(target) = graph.position(edge.target.as_str()) else {
                    continue;
                };
                if target != position {
                    forward[position].push((edge, target));
                    reverse[target].push(position);
                }
            }
        }

        Self { forward, reverse }
    }
}

fn reached_from(
    roots: &[usize],
    neighbours: impl Fn(usize) -> Vec<usize>,
    size: usize,
) -> Vec<bool> {
    let mut visited = vec![false; size];
    let mut queue: VecDeque<usize> = VecDeque::new();
    for &root in roots {
        if !visited[root] {
            visited[root] = true;
            queue.push_back(root);
        }
    }
    while let Some(current) = queue.pop_front() {
        for next in neighbours(current) {
            if !visited[next] {
                visited[next] = true;
                queue.push_back(next);
            }
        }
    }
    visited
}

pub(crate) fn check_flow(graph: &GraphIndex<'_>, out: &mut Vec<Violation>) {
    let nodes = &graph.definition().nodes;
    let adjacency = Adjacency::build(graph);
    let size = nodes.len();

    // Unreachable
    let starts = graph.positions_by_kind(NodeKind::Start);
    if !starts.is_empty() {
        let reached = reached_from(
            starts,
            |p| adjacency.forward[p].iter().map(|&(_, t)| t).collect(),
            size,
        );
        for (position, node) in nodes.iter().enumerate() {
            if graph.is_canonical(position)
                && node.kind != NodeKind::Start
                && !reached[position]
            {
                out.push(Violation::Unreachable {
                    node_id: node.id.clone(),
                });
            }
        }
    }

    // DeadEnd
    for (position, node) in nodes.iter().enumerate() {
        if graph.is_canonical(position)
            && node.kind != NodeKind::End
            && adjacency.forward[position].is_empty()
        {
            out.push(Violation::DeadEnd {
                node_id: node.id.clone(),
            });
        }
    }

    // Cycle
    let reaches_end = reached_from(
        graph.positions_by_kind(NodeKind::End),
        |p| adjacency.reverse[p].clone(),
        size,
    );
    if let Some((edge, _)) = first_trapping_back_edge(graph, &adjacency, &reaches_end) {
        out.push(Violation::Cycle {
            edge_id: edge.id.clone(),
            from: edge.source.clone(),
            to: edge.target.clone(),
        });
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Iterative DFS with recursion-stack marking. Roots are taken in node
/// declaration order and successors in edge declaration order; the first
/// back edge whose target cannot reach an end node is returned.
fn first_trapping_back_edge<'a>(
    graph: &GraphIndex<'a>,
    adjacency: &Adjacency<'a>,
    reaches_end: &[bool],
) -> Option<(&'a WorkflowEdge, usize)> {
    let size = adjacency.forward.len();
    let mut marks = vec![Mark::Unvisited; size];

    for root in 0..size {
        if !graph.is_canonical(root) || marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::OnStack;
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];

        while let Some(&(node, cursor)) = stack.last() {
            match adjacency.forward[node].get(cursor) {
                Some(&(edge, target)) => {
                    if let Some(top) = stack.last_mut() {
                        top.1 += 1;
                    }
                    match marks[target] {
                        Mark::Unvisited => {
                            marks[target] = Mark::OnStack;
                            stack.push((target, 0));
                        }
                        Mark::OnStack if !reaches_end[target] => return Some((edge, target)),
                        Mark::OnStack | Mark::Done => {}
                    }
                }
                None => {
                    marks[node] = Mark::Done;
                    stack.pop();
                }
            }
        }
    }

    None
}
