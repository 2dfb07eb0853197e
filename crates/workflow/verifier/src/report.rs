//! Verification report: integrity, derived status, and SLA breaches

use crate::chain::{verify_chain, RecordFault};
use crate::flow::{derive_status, ViolationReason};
use crate::policy::{policy_violations, PolicyViolation};
use crate::roles::RoleResolver;
use crate::sla::{sla_breaches, SlaBreach};
use serde::{Deserialize, Serialize};
use workflow_types::{Digest, InstanceStatus, RegisteredDefinition, WorkflowInstance};

/// Certified view of one instance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Every record verifies and obeys the append rules, the head matches,
    /// and the instance is pinned to the definition it was checked against
    pub integrity_ok: bool,
    /// Status derived from the recorded steps
    pub status: InstanceStatus,
    /// First record whose recomputed hash diverges from the stored one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_divergence_seq: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_fault: Option<RecordFault>,
    /// The instance's stored chain hash
    pub chain_hash: Digest,
    pub step_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at_seq: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation: Option<ViolationReason>,
    /// The pinned definition hash matches the definition supplied
    pub definition_matches: bool,
    /// Records the ledger would have rejected
    #[serde(default)]
    pub policy_violations: Vec<PolicyViolation>,
    #[serde(default)]
    pub sla_breaches: Vec<SlaBreach>,
}

impl VerificationReport {
    /// Whether the stored status disagrees with the derived one
    pub fn status_drift(&self, instance: &WorkflowInstance) -> bool {
        instance.status != self.status
    }
}

/// Verify an instance against its pinned definition.
///
/// Read-only and idempotent: the instance is never modified, and the same
/// inputs always produce the same report. Role membership is not checked;
/// see [`verify_with_roles`].
pub fn verify(
    instance: &WorkflowInstance,
    definition: &RegisteredDefinition,
) -> VerificationReport {
    build_report(instance, definition, None)
}

/// [`verify`], also checking each record's actor against the node's
/// required roles as `roles` answers today
pub fn verify_with_roles(
    instance: &WorkflowInstance,
    definition: &RegisteredDefinition,
    roles: &dyn RoleResolver,
) -> VerificationReport {
    build_report(instance, definition, Some(roles))
}

fn build_report(
    instance: &WorkflowInstance,
    definition: &RegisteredDefinition,
    roles: Option<&dyn RoleResolver>,
) -> VerificationReport {
    let chain = verify_chain(instance);
    let definition_matches = instance.definition_id == *definition.id()
        && instance.definition_version == definition.version()
        && instance.definition_hash == definition.content_hash();
    let derived = derive_status(definition.definition(), &instance.steps);
    let policy_violations = policy_violations(definition.definition(), &instance.steps, roles);

    VerificationReport {
        integrity_ok: chain.valid && definition_matches && policy_violations.is_empty(),
        status: derived.status,
        first_divergence_seq: chain.first_divergence_seq,
        chain_fault: chain.fault,
        chain_hash: instance.chain_hash,
        step_count: instance.steps.len(),
        decided_at_seq: derived.decided_at_seq,
        violation: derived.violation,
        definition_matches,
        policy_violations,
        sla_breaches: sla_breaches(definition.definition(), instance),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyFault;
    use crate::roles::StaticRoleResolver;
    use crate::test_support::{instance_with_steps, linear_definition};
    use workflow_types::{NodeId, StepOutcome, WorkflowStepRecord};

    #[test]
    fn test_report_for_completed_instance() {
        let def = linear_definition();
        let instance = instance_with_steps(
            &def,
            &[
                ("approve", StepOutcome::Completed, Some("abc")),
                ("end", StepOutcome::Completed, None),
            ],
        );

        let report = verify(&instance, &def);
        assert!(report.integrity_ok);
        assert_eq!(report.status, InstanceStatus::Completed);
        assert_eq!(report.step_count, 2);
        assert_eq!(report.chain_hash, instance.chain_hash);
        assert_eq!(report.first_divergence_seq, None);
        assert!(report.sla_breaches.is_empty());
    }

    #[test]
    fn test_verify_is_idempotent() {
        let def = linear_definition();
        let instance =
            instance_with_steps(&def, &[("approve", StepOutcome::Failed, Some("abc"))]);
        let before = instance.clone();

        let first = verify(&instance, &def);
        let second = verify(&instance, &def);
        assert_eq!(first, second);
        assert_eq!(instance, before);
        assert_eq!(first.violation, Some(ViolationReason::FailedWithoutAlternative));
    }

    #[test]
    fn test_tampered_record_reports_divergence() {
        let def = linear_definition();
        let mut instance = instance_with_steps(
            &def,
            &[
                ("approve", StepOutcome::Completed, Some("abc")),
                ("end", StepOutcome::Completed, None),
            ],
        );
        instance.steps[0].actor = "mallory".into();

        let report = verify(&instance, &def);
        assert!(!report.integrity_ok);
        assert_eq!(report.first_divergence_seq, Some(0));
        assert_eq!(report.chain_fault, Some(RecordFault::HashMismatch));
    }

    #[test]
    fn test_wrong_definition_fails_integrity() {
        let def = linear_definition();
        let mut instance = instance_with_steps(&def, &[]);
        instance.definition_hash = Digest::from_bytes([1; 32]);

        let report = verify(&instance, &def);
        assert!(!report.integrity_ok);
        assert!(!report.definition_matches);
        assert_eq!(report.first_divergence_seq, None);
    }

    #[test]
    fn test_status_drift() {
        let def = linear_definition();
        let mut instance = instance_with_steps(
            &def,
            &[
                ("approve", StepOutcome::Completed, Some("abc")),
                ("end", StepOutcome::Completed, None),
            ],
        );
        instance.status = InstanceStatus::InProgress;
        assert!(verify(&instance, &def).status_drift(&instance));
    }

    /// Re-chain a history after editing it, as a forger would
    fn rechain(instance: &mut WorkflowInstance) {
        let mut previous = Digest::GENESIS;
        for record in &mut instance.steps {
            record.previous_hash = previous;
            record.hash = record.compute_hash();
            previous = record.hash;
        }
        instance.chain_hash = previous;
    }

    #[test]
    fn test_rechained_history_without_evidence_fails() {
        let def = linear_definition();
        let mut instance = instance_with_steps(
            &def,
            &[
                ("approve", StepOutcome::Completed, Some("abc")),
                ("end", StepOutcome::Completed, None),
            ],
        );
        instance.steps[0].evidence_hash = None;
        rechain(&mut instance);

        let report = verify(&instance, &def);
        assert_eq!(report.first_divergence_seq, None);
        assert_eq!(report.status, InstanceStatus::Completed);
        assert!(!report.integrity_ok);
        assert_eq!(
            report.policy_violations,
            vec![PolicyViolation {
                sequence_number: 0,
                node_id: NodeId::new("approve"),
                fault: PolicyFault::MissingEvidence,
            }]
        );
    }

    #[test]
    fn test_rechained_history_with_backdated_step_fails() {
        let def = linear_definition();
        let mut instance = instance_with_steps(
            &def,
            &[
                ("approve", StepOutcome::Completed, Some("abc")),
                ("end", StepOutcome::Completed, None),
            ],
        );
        instance.steps[1].timestamp = instance.steps[0].timestamp - chrono::Duration::hours(1);
        rechain(&mut instance);

        let report = verify(&instance, &def);
        assert!(!report.integrity_ok);
        assert_eq!(report.policy_violations[0].fault, PolicyFault::TimestampRegression);
    }

    #[test]
    fn test_unauthorized_actor_fails_only_with_roles() {
        let def = linear_definition();
        let instance = instance_with_steps(
            &def,
            &[
                ("approve", StepOutcome::Completed, Some("abc")),
                ("end", StepOutcome::Completed, None),
            ],
        );

        assert!(verify(&instance, &def).integrity_ok);

        let report = verify_with_roles(&instance, &def, &StaticRoleResolver::new());
        assert!(!report.integrity_ok);
        assert_eq!(report.policy_violations[0].fault, PolicyFault::UnauthorizedActor);

        let managers = StaticRoleResolver::new().with_role("alice", "manager");
        assert!(verify_with_roles(&instance, &def, &managers).integrity_ok);
    }

    #[test]
    fn test_forged_step_after_completion_fails() {
        let def = linear_definition();
        let mut instance = instance_with_steps(
            &def,
            &[
                ("approve", StepOutcome::Completed, Some("abc")),
                ("end", StepOutcome::Completed, None),
            ],
        );
        let last = instance.steps[1].clone();
        instance.steps.push(WorkflowStepRecord::new(
            2,
            NodeId::new("end"),
            "alice",
            last.timestamp,
            StepOutcome::Completed,
            None,
            last.hash,
        ));
        rechain(&mut instance);

        let report = verify(&instance, &def);
        assert!(!report.integrity_ok);
        assert_eq!(report.decided_at_seq, Some(1));
        assert_eq!(report.policy_violations[0].fault, PolicyFault::AfterTerminal);
    }
}
