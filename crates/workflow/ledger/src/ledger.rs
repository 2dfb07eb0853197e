//! Instance ledger: append-only step logs, one per instance
//!
//! Each instance lives behind its own mutex, so at most one append is in
//! flight per instance while appends to different instances never contend.
//! A contended append either fails fast with `Busy` or waits for a bounded
//! time before doing so.

use crate::error::{AppendError, AppendResult, LedgerError, LedgerResult};
use crate::step::{HistoryPage, NewInstance, StepReport};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use workflow_types::{
    RegisteredDefinition, WorkflowDefinitionId, WorkflowInstance, WorkflowInstanceId,
    WorkflowStepRecord,
};
use workflow_verifier::{
    derive_status, verify, verify_with_roles, RoleResolver, VerificationReport,
};

struct InstanceSlot {
    instance: WorkflowInstance,
    definition: Arc<RegisteredDefinition>,
    /// Set when verification finds a chain mismatch; cleared only by an operator
    halted: bool,
    /// Position in creation order
    ordinal: u64,
}

/// Ledger of workflow instances
pub struct InstanceLedger {
    instances: DashMap<WorkflowInstanceId, Arc<Mutex<InstanceSlot>>>,
    next_ordinal: AtomicU64,
    roles: Arc<dyn RoleResolver>,
    /// Zero rejects a contended append immediately
    append_wait: Duration,
}

impl InstanceLedger {
    pub fn new(roles: Arc<dyn RoleResolver>) -> Self {
        Self {
            instances: DashMap::new(),
            next_ordinal: AtomicU64::new(0),
            roles,
            append_wait: Duration::ZERO,
        }
    }

    /// Queue contended appends for at most `wait` before returning `Busy`
    pub fn with_append_wait(mut self, wait: Duration) -> Self {
        self.append_wait = wait;
        self
    }

    // ── Instances ────────────────────────────────────────────────────

    /// Create an empty in-progress instance pinned to `definition`
    pub fn create(
        &self,
        definition: Arc<RegisteredDefinition>,
        request: NewInstance,
    ) -> WorkflowInstance {
        let mut instance = WorkflowInstance::new(&definition, request.assignee);
        instance.external_id = request.external_id;
        instance.notes = request.notes;

        tracing::info!(
            instance_id = %instance.id,
            definition_id = %instance.definition_id,
            version = instance.definition_version,
            "Workflow instance created"
        );

        let snapshot = instance.clone();
        self.instances.insert(
            instance.id.clone(),
            Arc::new(Mutex::new(InstanceSlot {
                instance,
                definition,
                halted: false,
                ordinal: self.next_ordinal.fetch_add(1, Ordering::Relaxed),
            })),
        );
        snapshot
    }

    /// Load a previously exported instance and verify it, roles included.
    ///
    /// The history is kept verbatim but the stored status is replaced by the
    /// one derived from it, since status is not covered by the chain. An
    /// instance that fails verification is stored halted, so it can be
    /// inspected but never appended to.
    pub fn import(
        &self,
        mut instance: WorkflowInstance,
        definition: Arc<RegisteredDefinition>,
    ) -> LedgerResult<VerificationReport> {
        if instance.definition_id != *definition.id()
            || instance.definition_version != definition.version()
        {
            return Err(LedgerError::DefinitionMismatch {
                expected_id: instance.definition_id.clone(),
                expected_version: instance.definition_version,
                actual_id: definition.id().clone(),
                actual_version: definition.version(),
            });
        }

        let report = verify_with_roles(&instance, &definition, self.roles.as_ref());
        if report.status_drift(&instance) {
            tracing::warn!(
                instance_id = %instance.id,
                stored = %instance.status,
                derived = %report.status,
                "Imported instance status disagrees with its history; using derived status"
            );
            instance.status = report.status;
        }

        let halted = !report.integrity_ok;
        if halted {
            tracing::error!(
                instance_id = %instance.id,
                first_divergence_seq = ?report.first_divergence_seq,
                chain_fault = ?report.chain_fault,
                policy_violations = report.policy_violations.len(),
                "Imported instance failed integrity verification; halted"
            );
        }

        match self.instances.entry(instance.id.clone()) {
            Entry::Occupied(_) => {
                Err(LedgerError::DuplicateInstance(instance.id))
            }
            Entry::Vacant(entry) => {
                tracing::info!(
                    instance_id = %instance.id,
                    steps = instance.steps.len(),
                    "Workflow instance imported"
                );
                entry.insert(Arc::new(Mutex::new(InstanceSlot {
                    instance,
                    definition,
                    halted,
                    ordinal: self.next_ordinal.fetch_add(1, Ordering::Relaxed),
                })));
                Ok(report)
            }
        }
    }

    /// Snapshot of an instance
    pub fn get(&self, instance_id: &WorkflowInstanceId) -> Option<WorkflowInstance> {
        self.slot(instance_id)
            .map(|slot| slot.lock().instance.clone())
    }

    /// Instances of one definition (any version), in creation order
    pub fn instances_for(&self, definition_id: &WorkflowDefinitionId) -> Vec<WorkflowInstance> {
        let slots: Vec<_> = self
            .instances
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut matching: Vec<(u64, WorkflowInstance)> = slots
            .iter()
            .filter_map(|slot| {
                let slot = slot.lock();
                (slot.instance.definition_id == *definition_id)
                    .then(|| (slot.ordinal, slot.instance.clone()))
            })
            .collect();
        matching.sort_by_key(|(ordinal, _)| *ordinal);
        matching.into_iter().map(|(_, instance)| instance).collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    // ── Append ───────────────────────────────────────────────────────

    /// Append one step to an instance.
    ///
    /// Checks run in a fixed order and the first failure is returned; a
    /// rejected append never modifies the instance. On success the status
    /// is re-derived from the full history.
    pub fn append(
        &self,
        instance_id: &WorkflowInstanceId,
        report: StepReport,
    ) -> AppendResult<WorkflowStepRecord> {
        let result = self.try_append(instance_id, report);
        if let Err(error) = &result {
            tracing::warn!(
                instance_id = %instance_id,
                kind = error.kind(),
                error = %error,
                "Step append rejected"
            );
        }
        result
    }

    fn try_append(
        &self,
        instance_id: &WorkflowInstanceId,
        report: StepReport,
    ) -> AppendResult<WorkflowStepRecord> {
        let slot = self
            .slot(instance_id)
            .ok_or_else(|| AppendError::InstanceNotFound(instance_id.clone()))?;
        let mut slot = self.lock_for_append(&slot, instance_id)?;

        if slot.halted {
            return Err(AppendError::IntegrityHalted(instance_id.clone()));
        }
        if slot.instance.is_terminal() {
            return Err(AppendError::InstanceTerminal {
                instance_id: instance_id.clone(),
                status: slot.instance.status,
            });
        }

        let definition = slot.definition.clone();
        let graph = definition.graph();
        let node = graph
            .node(report.node_id.as_str())
            .ok_or_else(|| AppendError::UnknownNode(report.node_id.clone()))?;

        if !node.required_roles.is_empty()
            && !node
                .required_roles
                .iter()
                .any(|role| self.roles.has_role(&report.actor, role))
        {
            return Err(AppendError::UnauthorizedActor {
                actor: report.actor.clone(),
                node_id: node.id.clone(),
                required: node.required_roles.iter().cloned().collect(),
            });
        }

        let evidence = report.normalized_evidence();
        match (node.requires_evidence, evidence.is_some()) {
            (true, false) => return Err(AppendError::MissingEvidence(node.id.clone())),
            (false, true) => return Err(AppendError::UnexpectedEvidence(node.id.clone())),
            _ => {}
        }

        let timestamp = report.timestamp.unwrap_or_else(Utc::now);
        if let Some(previous) = slot.instance.last_step() {
            if timestamp < previous.timestamp {
                return Err(AppendError::TimestampRegression {
                    previous: previous.timestamp,
                    attempted: timestamp,
                });
            }
        }

        let mut record = WorkflowStepRecord::new(
            slot.instance.next_sequence(),
            report.node_id,
            report.actor,
            timestamp,
            report.outcome,
            evidence,
            slot.instance.head_hash(),
        );
        if let Some(notes) = report.notes {
            record = record.with_notes(notes);
        }

        let instance = &mut slot.instance;
        instance.steps.push(record.clone());
        instance.chain_hash = record.hash;
        instance.updated_at = timestamp;
        instance.status = derive_status(definition.definition(), &instance.steps).status;

        tracing::info!(
            instance_id = %instance.id,
            sequence = record.sequence_number,
            node_id = %record.node_id,
            outcome = %record.outcome,
            status = %instance.status,
            "Step appended"
        );

        Ok(record)
    }

    fn lock_for_append<'a>(
        &self,
        slot: &'a Mutex<InstanceSlot>,
        instance_id: &WorkflowInstanceId,
    ) -> AppendResult<MutexGuard<'a, InstanceSlot>> {
        let guard = if self.append_wait.is_zero() {
            slot.try_lock()
        } else {
            slot.try_lock_for(self.append_wait)
        };
        guard.ok_or_else(|| AppendError::Busy(instance_id.clone()))
    }

    // ── Verification ─────────────────────────────────────────────────

    /// Verify an instance. A failed integrity check halts the instance.
    ///
    /// Roles are not re-checked here: every record in the ledger passed the
    /// role check when it was appended or imported.
    pub fn verify(&self, instance_id: &WorkflowInstanceId) -> LedgerResult<VerificationReport> {
        let slot = self
            .slot(instance_id)
            .ok_or_else(|| LedgerError::InstanceNotFound(instance_id.clone()))?;
        let mut slot = slot.lock();

        let report = verify(&slot.instance, &slot.definition);
        if !report.integrity_ok && !slot.halted {
            slot.halted = true;
            tracing::error!(
                instance_id = %instance_id,
                first_divergence_seq = ?report.first_divergence_seq,
                chain_fault = ?report.chain_fault,
                policy_violations = report.policy_violations.len(),
                "Instance chain integrity failure; appends halted"
            );
        }
        Ok(report)
    }

    pub fn is_halted(&self, instance_id: &WorkflowInstanceId) -> LedgerResult<bool> {
        self.slot(instance_id)
            .map(|slot| slot.lock().halted)
            .ok_or_else(|| LedgerError::InstanceNotFound(instance_id.clone()))
    }

    /// Lift a halt after manual investigation. The chain is not repaired.
    pub fn release_halt(&self, instance_id: &WorkflowInstanceId) -> LedgerResult<()> {
        let slot = self
            .slot(instance_id)
            .ok_or_else(|| LedgerError::InstanceNotFound(instance_id.clone()))?;
        slot.lock().halted = false;
        tracing::warn!(instance_id = %instance_id, "Integrity halt released by operator");
        Ok(())
    }

    // ── History ──────────────────────────────────────────────────────

    /// A page of step records in sequence order
    pub fn history(
        &self,
        instance_id: &WorkflowInstanceId,
        offset: usize,
        limit: usize,
    ) -> LedgerResult<HistoryPage> {
        let slot = self
            .slot(instance_id)
            .ok_or_else(|| LedgerError::InstanceNotFound(instance_id.clone()))?;
        let slot = slot.lock();
        let steps = &slot.instance.steps;

        let total = steps.len();
        let start = offset.min(total);
        let end = start.saturating_add(limit).min(total);
        Ok(HistoryPage {
            records: steps[start..end].to_vec(),
            offset: start,
            total,
            next_offset: (end < total).then_some(end),
        })
    }

    fn slot(&self, instance_id: &WorkflowInstanceId) -> Option<Arc<Mutex<InstanceSlot>>> {
        self.instances
            .get(instance_id)
            .map(|entry| entry.value().clone())
    }
}
