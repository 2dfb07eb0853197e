//! Workflow instances: executions of a registered definition
//!
//! An instance is a ledger, not a mutable record. It pins one immutable
//! definition version and only ever grows by appending step records. Its
//! status is derived from that history; the copy stored here is the value
//! last derived by the ledger, never an input.

use crate::{
    Digest, RegisteredDefinition, WorkflowDefinitionId, WorkflowInstanceId, WorkflowStepRecord,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Instance Status ──────────────────────────────────────────────────

/// Derived execution status of an instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceStatus {
    InProgress,
    Completed,
    Violated,
}

impl InstanceStatus {
    /// Completed and violated instances accept no further steps
    pub fn is_terminal(&self) -> bool {
        matches!(self, InstanceStatus::Completed | InstanceStatus::Violated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::InProgress => "in-progress",
            InstanceStatus::Completed => "completed",
            InstanceStatus::Violated => "violated",
        }
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Workflow Instance ────────────────────────────────────────────────

/// One execution of a workflow definition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowInstance {
    pub id: WorkflowInstanceId,
    /// The pinned definition
    pub definition_id: WorkflowDefinitionId,
    pub definition_version: u32,
    /// Content hash of the pinned definition at creation time
    pub definition_hash: Digest,
    /// Last derived status
    pub status: InstanceStatus,
    /// Who is responsible for driving this instance
    pub assignee: String,
    /// Reference in the caller's system (order number, ticket id, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Appended step records, in sequence order
    #[serde(default)]
    pub steps: Vec<WorkflowStepRecord>,
    /// Hash of the last record, or genesis when there are none
    pub chain_hash: Digest,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowInstance {
    /// Create an empty instance pinned to a registered definition
    pub fn new(definition: &RegisteredDefinition, assignee: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: WorkflowInstanceId::generate(),
            definition_id: definition.id().clone(),
            definition_version: definition.version(),
            definition_hash: definition.content_hash(),
            status: InstanceStatus::InProgress,
            assignee: assignee.into(),
            external_id: None,
            notes: None,
            steps: Vec::new(),
            chain_hash: Digest::GENESIS,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: WorkflowInstanceId) -> Self {
        self.id = id;
        self
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = created_at;
        self
    }

    pub fn last_step(&self) -> Option<&WorkflowStepRecord> {
        self.steps.last()
    }

    /// Sequence number the next appended record receives
    pub fn next_sequence(&self) -> u64 {
        self.steps.len() as u64
    }

    /// Hash the next appended record must link to
    pub fn head_hash(&self) -> Digest {
        self.steps.last().map(|s| s.hash).unwrap_or(Digest::GENESIS)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}
