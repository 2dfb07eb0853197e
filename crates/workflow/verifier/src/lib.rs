//! Workflow Verification
//!
//! Read-only checks over a [`WorkflowInstance`] and its pinned definition:
//!
//! - **Chain replay** recomputes every step record hash from genesis and
//!   reports the first sequence number where the stored history diverges.
//! - **Token flow** derives the instance status from its step history. It
//!   is the single implementation of the status state machine; the ledger
//!   calls it after every append.
//! - **Policy replay** re-checks every stored record against the append
//!   rules (known node, evidence, timestamp order, and optionally roles), so
//!   a forged history that was re-chained from scratch still fails.
//! - **SLA report** lists steps recorded later than their node allows.
//!
//! Nothing here mutates an instance. Every function is safe to call at any
//! time and returns the same answer for the same input.
//!
//! [`WorkflowInstance`]: workflow_types::WorkflowInstance

#![deny(unsafe_code)]

pub mod chain;
pub mod flow;
pub mod policy;
pub mod report;
pub mod roles;
pub mod sla;

pub use chain::{verify_chain, verify_record, ChainVerification, RecordFault};
pub use flow::{derive_status, StatusDerivation, TokenFlow, ViolationReason};
pub use policy::{policy_violations, PolicyFault, PolicyViolation};
pub use report::{verify, verify_with_roles, VerificationReport};
pub use roles::{RoleResolver, StaticRoleResolver};
pub use sla::{sla_breaches, SlaBreach};

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, TimeZone, Utc};
    use workflow_types::{
        Digest, NodeId, RegisteredDefinition, StepOutcome, WorkflowDefinition, WorkflowInstance,
        WorkflowNode, WorkflowStepRecord,
    };

    fn seal(definition: WorkflowDefinition) -> RegisteredDefinition {
        let published = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        RegisteredDefinition::seal(definition, Digest::from_bytes([3; 32]), published)
    }

    /// start -> approve (manager, evidence, 8h SLA) -> end
    pub fn linear_definition() -> RegisteredDefinition {
        let mut def = WorkflowDefinition::new("expense", "Expense Claim", 1)
            .with_node(WorkflowNode::start("start"))
            .with_node(
                WorkflowNode::approval("approve", "Manager approval")
                    .with_role("manager")
                    .with_evidence()
                    .with_sla_hours(8),
            )
            .with_node(WorkflowNode::end("end"));
        def.connect("start", "approve");
        def.connect("approve", "end");
        seal(def)
    }

    /// start -> triage -> {fast_track, escalate} -> end
    pub fn branching_definition() -> RegisteredDefinition {
        let mut def = WorkflowDefinition::new("ticket", "Support Ticket", 1)
            .with_node(WorkflowNode::start("start"))
            .with_node(WorkflowNode::review("triage", "Triage"))
            .with_node(WorkflowNode::manual("fast_track", "Fast track"))
            .with_node(WorkflowNode::manual("escalate", "Escalate"))
            .with_node(WorkflowNode::end("end"));
        def.connect("start", "triage");
        def.connect("triage", "fast_track");
        def.connect("triage", "escalate");
        def.connect("fast_track", "end");
        def.connect("escalate", "end");
        seal(def)
    }

    /// start -> draft -> review -> {draft, end}
    pub fn rework_definition() -> RegisteredDefinition {
        let mut def = WorkflowDefinition::new("doc", "Document Review", 1)
            .with_node(WorkflowNode::start("start"))
            .with_node(WorkflowNode::manual("draft", "Draft"))
            .with_node(WorkflowNode::review("review", "Review"))
            .with_node(WorkflowNode::end("end"));
        def.connect("start", "draft");
        def.connect("draft", "review");
        def.connect("review", "draft");
        def.connect("review", "end");
        seal(def)
    }

    /// Build a correctly chained instance, one minute between steps
    pub fn instance_with_steps(
        definition: &RegisteredDefinition,
        steps: &[(&str, StepOutcome, Option<&str>)],
    ) -> WorkflowInstance {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let mut instance = WorkflowInstance::new(definition, "alice").with_created_at(created);

        for (index, (node, outcome, evidence)) in steps.iter().enumerate() {
            let record = WorkflowStepRecord::new(
                index as u64,
                NodeId::new(*node),
                "alice",
                created + Duration::minutes(index as i64 + 1),
                *outcome,
                evidence.map(str::to_string),
                instance.head_hash(),
            );
            instance.chain_hash = record.hash;
            instance.updated_at = record.timestamp;
            instance.steps.push(record);
        }
        instance.status = crate::derive_status(definition.definition(), &instance.steps).status;
        instance
    }
}
