//! Workflow edges: transitions between process steps
//!
//! An edge may carry a condition. The condition is opaque to this system;
//! the actor walking the process evaluates it and reports the step it took.

use crate::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};

/// A directed transition in the workflow graph
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowEdge {
    /// Unique identifier within this workflow
    pub id: EdgeId,
    /// Source node
    pub source: NodeId,
    /// Target node
    pub target: NodeId,
    /// Guard evaluated by the executing actor, never by this system
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl WorkflowEdge {
    /// Create an unconditional edge
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: EdgeId::new(id),
            source: NodeId::new(source),
            target: NodeId::new(target),
            condition: None,
        }
    }

    /// Create an edge guarded by a condition
    pub fn conditional(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        Self {
            condition: Some(condition.into()),
            ..Self::new(id, source, target)
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}
