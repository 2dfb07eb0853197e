//! Workflow definitions: the blueprint of a business process
//!
//! A WorkflowDefinition is a directed graph where:
//! - Nodes are process steps (approval, review, audit, manual work)
//! - Edges are the transitions an instance may take between them
//!
//! Drafts are ordinary mutable values owned by the editor. Once a draft is
//! accepted by the registry it is sealed into a [`RegisteredDefinition`]
//! and never changes again. To modify it, register a new version.

use crate::{Digest, GraphIndex, NodeId, WorkflowDefinitionId, WorkflowEdge};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ── Workflow Definition ──────────────────────────────────────────────

/// A workflow definition draft
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Identifier shared by every version of this workflow
    pub id: WorkflowDefinitionId,
    /// Human-readable name
    pub name: String,
    /// Description of what this workflow accomplishes
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Version, strictly increasing per `id`
    pub version: u32,
    /// The process steps. Declaration order is significant for reporting.
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    /// The transitions between steps
    #[serde(default)]
    pub edges: Vec<WorkflowEdge>,
}

impl WorkflowDefinition {
    /// Create an empty draft
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: u32) -> Self {
        Self {
            id: WorkflowDefinitionId::new(id),
            name: name.into(),
            description: String::new(),
            version,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_node(mut self, node: WorkflowNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_edge(mut self, edge: WorkflowEdge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Add a node to the draft. No checks happen here; see the validator.
    pub fn add_node(&mut self, node: WorkflowNode) {
        self.nodes.push(node);
    }

    /// Add an edge to the draft. No checks happen here; see the validator.
    pub fn add_edge(&mut self, edge: WorkflowEdge) {
        self.edges.push(edge);
    }

    /// Connect two nodes with an unconditional edge named `source->target`
    pub fn connect(&mut self, source: impl Into<String>, target: impl Into<String>) {
        let source = source.into();
        let target = target.into();
        let id = format!("{}->{}", source, target);
        self.edges.push(WorkflowEdge::new(id, source, target));
    }

    /// Build the lookup index over this definition
    pub fn graph(&self) -> GraphIndex<'_> {
        GraphIndex::new(self)
    }

    /// Total number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

// ── Registered Definition ────────────────────────────────────────────

/// A definition accepted by the registry: immutable and content-addressed
///
/// Serialize-only: a registered definition is never read back from the
/// wire. Import a draft and register it instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegisteredDefinition {
    definition: WorkflowDefinition,
    content_hash: Digest,
    published_at: DateTime<Utc>,
}

impl RegisteredDefinition {
    /// Seal a definition with its content hash.
    ///
    /// The hash is taken as given. Only a definition handed out by the
    /// registry is known to be validated with a matching hash; values
    /// sealed elsewhere are test fixtures.
    pub fn seal(
        definition: WorkflowDefinition,
        content_hash: Digest,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            definition,
            content_hash,
            published_at,
        }
    }

    pub fn definition(&self) -> &WorkflowDefinition {
        &self.definition
    }

    pub fn id(&self) -> &WorkflowDefinitionId {
        &self.definition.id
    }

    pub fn version(&self) -> u32 {
        self.definition.version
    }

    pub fn content_hash(&self) -> Digest {
        self.content_hash
    }

    /// The content hash in its `0x`-prefixed "contract address" form
    pub fn address(&self) -> String {
        self.content_hash.address()
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    pub fn graph(&self) -> GraphIndex<'_> {
        self.definition.graph()
    }
}

// ── Workflow Node ────────────────────────────────────────────────────

fn default_sla_hours() -> u32 {
    24
}

/// A process step in the workflow graph
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowNode {
    /// Unique identifier within this workflow
    pub id: NodeId,
    /// What kind of step this is
    pub kind: NodeKind,
    /// Human-readable name
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Roles allowed to report this step. Empty means anyone may.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub required_roles: BTreeSet<String>,
    /// Expected completion time, measured from the previous step
    #[serde(default = "default_sla_hours")]
    pub sla_hours: u32,
    /// Whether each report of this step must carry an evidence hash
    #[serde(default)]
    pub requires_evidence: bool,
}

impl WorkflowNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: NodeId::new(id),
            kind,
            label: label.into(),
            description: None,
            required_roles: BTreeSet::new(),
            sla_hours: default_sla_hours(),
            requires_evidence: false,
        }
    }

    pub fn start(id: impl Into<String>) -> Self {
        Self::new(id, "Start", NodeKind::Start)
    }

    pub fn end(id: impl Into<String>) -> Self {
        Self::new(id, "End", NodeKind::End)
    }

    pub fn approval(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, label, NodeKind::Approval)
    }

    pub fn review(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, label, NodeKind::Review)
    }

    pub fn audit(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, label, NodeKind::Audit)
    }

    pub fn manual(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, label, NodeKind::Manual)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.required_roles.insert(role.into());
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn with_sla_hours(mut self, hours: u32) -> Self {
        self.sla_hours = hours;
        self
    }

    pub fn with_evidence(mut self) -> Self {
        self.requires_evidence = true;
        self
    }

    /// A mandatory step blocks its path when skipped
    pub fn is_mandatory(&self) -> bool {
        self.requires_evidence || matches!(self.kind, NodeKind::Approval | NodeKind::Audit)
    }
}

// ── Node Kind ────────────────────────────────────────────────────────

/// The kind of a workflow node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// The entry point; exactly one per definition
    Start,
    /// A sign-off by an authorised role
    Approval,
    /// An inspection that may route the work back
    Review,
    /// A compliance check
    Audit,
    /// Work performed by hand outside the system
    Manual,
    /// A terminal node; an instance completes when it reaches one
    End,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Start => "start",
            NodeKind::Approval => "approval",
            NodeKind::Review => "review",
            NodeKind::Audit => "audit",
            NodeKind::Manual => "manual",
            NodeKind::End => "end",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
