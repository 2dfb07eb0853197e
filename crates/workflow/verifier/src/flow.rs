//! Token-flow status derivation
//!
//! The recorded steps are walked in order, moving a set of enabled nodes
//! through the definition graph. The start node is passed implicitly, so
//! the walk begins with the successors of start enabled.
//!
//! | Outcome    | Node                       | Effect                                  |
//! |------------|----------------------------|-----------------------------------------|
//! | completed  | end                        | instance completed                      |
//! | completed  | any other                  | successors enabled                      |
//! | skipped    | mandatory                  | path blocked                            |
//! | skipped    | optional                   | successors enabled                      |
//! | failed     | fewer than 2 out-edges     | violated, no alternative route          |
//! | failed     | 2 or more out-edges        | successors enabled                      |
//!
//! A step on a node that is not enabled is out of order. After every step,
//! if no enabled node can still reach an end node the instance is violated.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use workflow_types::{
    GraphIndex, InstanceStatus, NodeId, NodeKind, StepOutcome, WorkflowDefinition,
    WorkflowStepRecord,
};

/// Why a token-flow walk ended in `violated`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationReason {
    /// A step was recorded on a node that was not enabled
    OutOfOrder,
    /// A step failed on a node with no alternative outgoing edge
    FailedWithoutAlternative,
    /// No enabled node can reach an end node any more
    Blocked,
}

impl std::fmt::Display for ViolationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationReason::OutOfOrder => write!(f, "step out of order"),
            ViolationReason::FailedWithoutAlternative => {
                write!(f, "step failed with no alternative route")
            }
            ViolationReason::Blocked => write!(f, "no end node is reachable"),
        }
    }
}

/// Derived status of a step history
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDerivation {
    pub status: InstanceStatus,
    /// Sequence number of the step that decided a terminal status
    pub decided_at_seq: Option<u64>,
    pub violation: Option<ViolationReason>,
}

impl StatusDerivation {
    fn in_progress() -> Self {
        Self {
            status: InstanceStatus::InProgress,
            decided_at_seq: None,
            violation: None,
        }
    }

    fn completed(seq: u64) -> Self {
        Self {
            status: InstanceStatus::Completed,
            decided_at_seq: Some(seq),
            violation: None,
        }
    }

    fn violated(seq: u64, reason: ViolationReason) -> Self {
        Self {
            status: InstanceStatus::Violated,
            decided_at_seq: Some(seq),
            violation: Some(reason),
        }
    }
}

/// Incremental token-flow state over one definition
#[derive(Clone, Debug)]
pub struct TokenFlow<'a> {
    graph: GraphIndex<'a>,
    /// Node position -> an end node is reachable from it
    reaches_end: Vec<bool>,
    enabled: BTreeSet<usize>,
    decision: StatusDerivation,
}

impl<'a> TokenFlow<'a> {
    pub fn new(definition: &'a WorkflowDefinition) -> Self {
        let graph = definition.graph();
        let reaches_end = reaches_end(&graph);
        let enabled = graph
            .positions_by_kind(NodeKind::Start)
            .iter()
            .flat_map(|&start| graph.successor_positions(start))
            .collect();

        Self {
            graph,
            reaches_end,
            enabled,
            decision: StatusDerivation::in_progress(),
        }
    }

    /// Apply one recorded step. Steps after a terminal decision are ignored.
    pub fn apply(
        &mut self,
        seq: u64,
        node_id: &NodeId,
        outcome: StepOutcome,
    ) -> &StatusDerivation {
        if self.decision.status.is_terminal() {
            return &self.decision;
        }

        let Some(position) = self.graph.position(node_id.as_str()) else {
            self.decision = StatusDerivation::violated(seq, ViolationReason::OutOfOrder);
            return &self.decision;
        };
        let node = &self.graph.definition().nodes[position];

        if node.kind != NodeKind::Start {
            if !self.enabled.remove(&position) {
                self.decision = StatusDerivation::violated(seq, ViolationReason::OutOfOrder);
                return &self.decision;
            }

            match outcome {
                StepOutcome::Completed if node.kind == NodeKind::End => {
                    self.decision = StatusDerivation::completed(seq);
                    return &self.decision;
                }
                StepOutcome::Completed => self.enable_successors(position),
                StepOutcome::Skipped if node.is_mandatory() => {}
                StepOutcome::Skipped => self.enable_successors(position),
                StepOutcome::Failed if self.graph.out_degree(position) < 2 => {
                    self.decision =
                        StatusDerivation::violated(seq, ViolationReason::FailedWithoutAlternative);
                    return &self.decision;
                }
                StepOutcome::Failed => self.enable_successors(position),
            }
        }

        if !self.enabled.iter().any(|&p| self.reaches_end[p]) {
            self.decision = StatusDerivation::violated(seq, ViolationReason::Blocked);
        }
        &self.decision
    }

    /// Nodes a next step may be recorded on, in declaration order
    pub fn enabled_nodes(&self) -> Vec<&'a NodeId> {
        let nodes = &self.graph.definition().nodes;
        self.enabled.iter().map(|&p| &nodes[p].id).collect()
    }

    pub fn decision(&self) -> &StatusDerivation {
        &self.decision
    }

    fn enable_successors(&mut self, position: usize) {
        self.enabled.extend(self.graph.successor_positions(position));
    }
}

/// Reverse BFS from every end node
fn reaches_end(graph: &GraphIndex<'_>) -> Vec<bool> {
    let mut reached = vec![false; graph.node_count()];
    let mut queue: VecDeque<usize> = graph
        .positions_by_kind(NodeKind::End)
        .iter()
        .copied()
        .collect();
    for &end in &queue {
        reached[end] = true;
    }
    while let Some(current) = queue.pop_front() {
        for previous in graph.predecessor_positions(current) {
            if !reached[previous] {
                reached[previous] = true;
                queue.push_back(previous);
            }
        }
    }
    reached
}

/// Derive the status of a step history against its pinned definition
pub fn derive_status(
    definition: &WorkflowDefinition,
    steps: &[WorkflowStepRecord],
) -> StatusDerivation {
    let mut flow = TokenFlow::new(definition);
    for step in steps {
        if flow
            .apply(step.sequence_number, &step.node_id, step.outcome)
            .status
            .is_terminal()
        {
            break;
        }
    }
    flow.decision().clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        branching_definition, instance_with_steps, linear_definition, rework_definition,
    };
    use workflow_types::StepOutcome::*;

    fn status_of(
        definition: &workflow_types::RegisteredDefinition,
        steps: &[(&str, StepOutcome, Option<&str>)],
    ) -> StatusDerivation {
        let instance = instance_with_steps(definition, steps);
        derive_status(definition.definition(), &instance.steps)
    }

    #[test]
    fn test_no_steps_is_in_progress() {
        let def = linear_definition();
        assert_eq!(status_of(&def, &[]).status, InstanceStatus::InProgress);
    }

    #[test]
    fn test_linear_completion() {
        let def = linear_definition();
        let partial = status_of(&def, &[("approve", Completed, Some("abc"))]);
        assert_eq!(partial.status, InstanceStatus::InProgress);

        let done = status_of(
            &def,
            &[("approve", Completed, Some("abc")), ("end", Completed, None)],
        );
        assert_eq!(done.status, InstanceStatus::Completed);
        assert_eq!(done.decided_at_seq, Some(1));
        assert_eq!(done.violation, None);
    }

    #[test]
    fn test_step_on_start_is_a_no_op() {
        let def = linear_definition();
        let result = status_of(
            &def,
            &[
                ("start", Completed, None),
                ("approve", Completed, Some("abc")),
                ("end", Completed, None),
            ],
        );
        assert_eq!(result.status, InstanceStatus::Completed);
        assert_eq!(result.decided_at_seq, Some(2));
    }

    #[test]
    fn test_failed_without_alternative_violates() {
        let def = linear_definition();
        let result = status_of(&def, &[("approve", Failed, Some("abc"))]);
        assert_eq!(result.status, InstanceStatus::Violated);
        assert_eq!(result.violation, Some(ViolationReason::FailedWithoutAlternative));
        assert_eq!(result.decided_at_seq, Some(0));
    }

    #[test]
    fn test_skipping_mandatory_node_blocks() {
        let def = linear_definition();
        let result = status_of(&def, &[("approve", Skipped, Some("abc"))]);
        assert_eq!(result.status, InstanceStatus::Violated);
        assert_eq!(result.violation, Some(ViolationReason::Blocked));
    }

    #[test]
    fn test_out_of_order_step_violates() {
        let def = linear_definition();
        let result = status_of(&def, &[("end", Completed, None)]);
        assert_eq!(result.status, InstanceStatus::Violated);
        assert_eq!(result.violation, Some(ViolationReason::OutOfOrder));
    }

    #[test]
    fn test_failed_with_alternative_continues() {
        let def = branching_definition();
        let result = status_of(&def, &[("triage", Failed, None)]);
        assert_eq!(result.status, InstanceStatus::InProgress);

        let result = status_of(
            &def,
            &[
                ("triage", Failed, None),
                ("escalate", Completed, None),
                ("end", Completed, None),
            ],
        );
        assert_eq!(result.status, InstanceStatus::Completed);
    }

    #[test]
    fn test_skipping_optional_node_passes_token() {
        let def = branching_definition();
        let result = status_of(
            &def,
            &[("triage", Skipped, None), ("fast_track", Completed, None)],
        );
        assert_eq!(result.status, InstanceStatus::InProgress);
    }

    #[test]
    fn test_rework_loop_reenables_node() {
        let def = rework_definition();
        let result = status_of(
            &def,
            &[
                ("draft", Completed, None),
                ("review", Completed, None),
                ("draft", Completed, None),
                ("review", Completed, None),
                ("end", Completed, None),
            ],
        );
        assert_eq!(result.status, InstanceStatus::Completed);
        assert_eq!(result.decided_at_seq, Some(4));
    }

    #[test]
    fn test_enabled_nodes_track_the_token() {
        let def = linear_definition();
        let mut flow = TokenFlow::new(def.definition());
        assert_eq!(flow.enabled_nodes(), vec![&NodeId::new("approve")]);
        flow.apply(0, &NodeId::new("approve"), Completed);
        assert_eq!(flow.enabled_nodes(), vec![&NodeId::new("end")]);
    }

    #[test]
    fn test_steps_after_decision_are_ignored() {
        let def = linear_definition();
        let result = status_of(
            &def,
            &[("end", Completed, None), ("approve", Completed, Some("abc"))],
        );
        assert_eq!(result.decided_at_seq, Some(0));
    }
}
