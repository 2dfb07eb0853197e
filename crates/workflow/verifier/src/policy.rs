//! Policy replay: re-check every stored record against the append rules
//!
//! A hash chain proves the history was not edited after the fact, but it
//! carries no secret, so a forged history can be chained just as well.
//! Replaying the pinned definition's rules over each record catches a
//! history the ledger would never have accepted.

use crate::flow::TokenFlow;
use crate::roles::RoleResolver;
use serde::{Deserialize, Serialize};
use workflow_types::{GraphIndex, NodeId, WorkflowDefinition, WorkflowStepRecord};

/// Which append rule a stored record breaks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyFault {
    /// Recorded after the instance had already completed or been violated
    AfterTerminal,
    UnknownNode,
    UnauthorizedActor,
    MissingEvidence,
    UnexpectedEvidence,
    TimestampRegression,
}

/// One record that breaks an append rule
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyViolation {
    pub sequence_number: u64,
    pub node_id: NodeId,
    pub fault: PolicyFault,
}

/// Replay the append rules over a stored history.
///
/// Rules are checked per record in the order the ledger applies them and
/// only the first broken rule of each record is reported. Role membership
/// is checked only when a resolver is supplied.
pub fn policy_violations(
    definition: &WorkflowDefinition,
    steps: &[WorkflowStepRecord],
    roles: Option<&dyn RoleResolver>,
) -> Vec<PolicyViolation> {
    let graph = definition.graph();
    let mut flow = TokenFlow::new(definition);
    let mut violations = Vec::new();
    let mut previous: Option<&WorkflowStepRecord> = None;

    for record in steps {
        let terminal = flow.decision().status.is_terminal();
        if let Some(fault) = record_fault(&graph, record, previous, roles, terminal) {
            violations.push(PolicyViolation {
                sequence_number: record.sequence_number,
                node_id: record.node_id.clone(),
                fault,
            });
        }
        flow.apply(record.sequence_number, &record.node_id, record.outcome);
        previous = Some(record);
    }
    violations
}

fn record_fault(
    graph: &GraphIndex<'_>,
    record: &WorkflowStepRecord,
    previous: Option<&WorkflowStepRecord>,
    roles: Option<&dyn RoleResolver>,
    terminal: bool,
) -> Option<PolicyFault> {
    if terminal {
        return Some(PolicyFault::AfterTerminal);
    }

    let Some(node) = graph.node(record.node_id.as_str()) else {
        return Some(PolicyFault::UnknownNode);
    };

    if let Some(roles) = roles {
        if !node.required_roles.is_empty()
            && !node
                .required_roles
                .iter()
                .any(|role| roles.has_role(&record.actor, role))
        {
            return Some(PolicyFault::UnauthorizedActor);
        }
    }

    let has_evidence = record
        .evidence_hash
        .as_deref()
        .is_some_and(|evidence| !evidence.trim().is_empty());
    match (node.requires_evidence, has_evidence) {
        (true, false) => return Some(PolicyFault::MissingEvidence),
        (false, true) => return Some(PolicyFault::UnexpectedEvidence),
        _ => {}
    }

    match previous {
        Some(previous) if record.timestamp < previous.timestamp => {
            Some(PolicyFault::TimestampRegression)
        }
        _ => None,
    }
}
