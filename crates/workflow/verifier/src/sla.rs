//! SLA report: steps that took longer than their node allows

use serde::{Deserialize, Serialize};
use workflow_types::{NodeId, WorkflowDefinition, WorkflowInstance};

/// A step recorded later than its node's SLA permits
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaBreach {
    pub sequence_number: u64,
    pub node_id: NodeId,
    pub sla_hours: u32,
    /// Time since the previous step, or since creation for the first step
    pub elapsed_minutes: i64,
}

/// Collect SLA breaches. Informational only; status is unaffected.
pub fn sla_breaches(
    definition: &WorkflowDefinition,
    instance: &WorkflowInstance,
) -> Vec<SlaBreach> {
    let graph = definition.graph();
    let mut since = instance.created_at;
    let mut breaches = Vec::new();

    for step in &instance.steps {
        let elapsed = step.timestamp.signed_duration_since(since);
        since = step.timestamp;

        let Some(node) = graph.node(step.node_id.as_str()) else {
            continue;
        };
        if elapsed > chrono::Duration::hours(i64::from(node.sla_hours)) {
            breaches.push(SlaBreach {
                sequence_number: step.sequence_number,
                node_id: step.node_id.clone(),
                sla_hours: node.sla_hours,
                elapsed_minutes: elapsed.num_minutes(),
            });
        }
    }

    breaches
}
