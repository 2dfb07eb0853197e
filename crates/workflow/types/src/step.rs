//! Step records: the hash-chained entries of an instance ledger
//!
//! Each record commits to its own fields and to the hash of the record
//! before it, so recomputing the chain from genesis exposes any edit to
//! the stored history at or after the point where the hashes diverge.

use crate::{Digest, FieldHasher, NodeId};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

const STEP_DOMAIN: &str = "workflow-step-v1";

/// Outcome an actor reports for one step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Completed,
    Skipped,
    Failed,
}

impl StepOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepOutcome::Completed => "completed",
            StepOutcome::Skipped => "skipped",
            StepOutcome::Failed => "failed",
        }
    }
}

impl std::fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One appended step execution
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStepRecord {
    /// Position in the instance history, starting at 0
    pub sequence_number: u64,
    /// The step that was executed
    pub node_id: NodeId,
    /// Identity of the reporting actor
    pub actor: String,
    /// Non-decreasing within an instance
    pub timestamp: DateTime<Utc>,
    pub outcome: StepOutcome,
    /// Present exactly when the node requires evidence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_hash: Option<String>,
    /// Free-form remark from the actor; committed by the hash like every
    /// other field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Hash of the prior record, or [`Digest::GENESIS`] for the first
    pub previous_hash: Digest,
    /// Hash of this record as stored when it was appended
    pub hash: Digest,
}

impl WorkflowStepRecord {
    /// Build a record and compute its hash
    pub fn new(
        sequence_number: u64,
        node_id: NodeId,
        actor: impl Into<String>,
        timestamp: DateTime<Utc>,
        outcome: StepOutcome,
        evidence_hash: Option<String>,
        previous_hash: Digest,
    ) -> Self {
        let mut record = Self {
            sequence_number,
            node_id,
            actor: actor.into(),
            timestamp,
            outcome,
            evidence_hash,
            notes: None,
            previous_hash,
            hash: Digest::GENESIS,
        };
        record.hash = record.compute_hash();
        record
    }

    /// Attach actor notes and rehash
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self.hash = self.compute_hash();
        self
    }

    /// H(sequence ‖ node ‖ actor ‖ timestamp ‖ outcome ‖ evidence ‖ notes ‖ previous)
    pub fn compute_hash(&self) -> Digest {
        FieldHasher::new(STEP_DOMAIN)
            .field(self.sequence_number.to_le_bytes())
            .field(self.node_id.as_str())
            .field(&self.actor)
            .field(
                self.timestamp
                    .to_rfc3339_opts(SecondsFormat::Nanos, true),
            )
            .field(self.outcome.as_str())
            .optional_field(self.evidence_hash.as_deref())
            .optional_field(self.notes.as_deref())
            .field(self.previous_hash.as_bytes())
            .finish()
    }

    /// Whether the stored hash matches the record's fields
    pub fn hash_matches(&self) -> bool {
        self.compute_hash() == self.hash
    }
}
