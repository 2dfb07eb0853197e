//! Workflow Validator
//!
//! Checks a draft [`WorkflowDefinition`] for structural and policy
//! correctness before it may be registered. Validation is a pure function:
//! it never mutates the draft, never fails fast, and always reports every
//! violation so the editor can fix them in one pass.
//!
//! # Ordering
//!
//! Violations are reported check by check, in this order, and within each
//! check in node or edge declaration order:
//!
//! 1. `TooFewNodes`, `MissingStart`, `MultipleStart`, `MissingEnd`
//! 2. `DuplicateNodeId`, `DuplicateEdgeId`
//! 3. `DanglingEdge`, `SelfLoop`
//! 4. `InvalidSla`
//! 5. `Unreachable`, `DeadEnd`, `Cycle`
//!
//! The same input therefore always yields the same list.
//!
//! # Example
//!
//! ```rust
//! use workflow_types::{WorkflowDefinition, WorkflowNode};
//! use workflow_validator::{validate, ViolationKind};
//!
//! let mut draft = WorkflowDefinition::new("expense", "Expense Claim", 1)
//!     .with_node(WorkflowNode::start("start"))
//!     .with_node(WorkflowNode::approval("approve", "Approve"))
//!     .with_node(WorkflowNode::end("end"));
//! draft.connect("start", "approve");
//!
//! let result = validate(&draft);
//! assert!(!result.is_valid());
//! assert_eq!(result.violations()[0].kind(), ViolationKind::Unreachable);
//! ```

#![deny(unsafe_code)]

mod checks;
mod flow;
mod violation;

pub use violation::{Violation, ViolationKind};

use serde::{Deserialize, Serialize};
use workflow_types::WorkflowDefinition;

/// Outcome of validating a definition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "violations", rename_all = "snake_case")]
pub enum ValidationResult {
    Valid,
    Invalid(Vec<Violation>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// All violations, empty when valid
    pub fn violations(&self) -> &[Violation] {
        match self {
            ValidationResult::Valid => &[],
            ValidationResult::Invalid(violations) => violations,
        }
    }

    pub fn into_result(self) -> Result<(), Vec<Violation>> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid(violations) => Err(violations),
        }
    }
}

/// Validate a definition, returning every violation found
pub fn validate(definition: &WorkflowDefinition) -> ValidationResult {
    let graph = definition.graph();
    let mut violations = Vec::new();

    checks::check_node_counts(&graph, &mut violations);
    checks::check_duplicate_ids(&graph, &mut violations);
    checks::check_edges(&graph, &mut violations);
    checks::check_sla(&graph, &mut violations);
    flow::check_flow(&graph, &mut violations);

    if violations.is_empty() {
        ValidationResult::Valid
    } else {
        ValidationResult::Invalid(violations)
    }
}
