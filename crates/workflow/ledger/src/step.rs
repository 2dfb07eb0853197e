//! Inputs to the ledger: step reports and new-instance requests

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use workflow_types::{NodeId, StepOutcome, WorkflowStepRecord};

/// A step execution reported by an actor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub node_id: NodeId,
    pub actor: String,
    pub outcome: StepOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Defaults to the append time when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl StepReport {
    pub fn new(
        node_id: impl Into<String>,
        actor: impl Into<String>,
        outcome: StepOutcome,
    ) -> Self {
        Self {
            node_id: NodeId::new(node_id),
            actor: actor.into(),
            outcome,
            evidence_hash: None,
            notes: None,
            timestamp: None,
        }
    }

    pub fn completed(node_id: impl Into<String>, actor: impl Into<String>) -> Self {
        Self::new(node_id, actor, StepOutcome::Completed)
    }

    pub fn with_evidence(mut self, evidence_hash: impl Into<String>) -> Self {
        self.evidence_hash = Some(evidence_hash.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Evidence with whitespace-only values treated as absent
    pub(crate) fn normalized_evidence(&self) -> Option<String> {
        self.evidence_hash
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .map(str::to_string)
    }
}

/// Metadata for a new instance
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInstance {
    pub assignee: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewInstance {
    pub fn new(assignee: impl Into<String>) -> Self {
        Self {
            assignee: assignee.into(),
            ..Default::default()
        }
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// One page of an instance's step history
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub records: Vec<WorkflowStepRecord>,
    pub offset: usize,
    pub total: usize,
    /// Offset of the next page, absent on the last page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<usize>,
}
