//! Canonical encoding and content hashing of definitions
//!
//! The canonical form sorts nodes and edges by id so that two drafts that
//! differ only in declaration order hash to the same content address.
//! Registration metadata (`published_at`, the hash itself) is excluded.

use crate::{RegistrationError, RegistryResult};
use serde::Serialize;
use workflow_types::{Digest, FieldHasher, WorkflowDefinition, WorkflowEdge, WorkflowNode};

const DEFINITION_DOMAIN: &str = "workflow-definition-v1";

#[derive(Serialize)]
struct CanonicalDefinition<'a> {
    id: &'a str,
    name: &'a str,
    description: &'a str,
    version: u32,
    nodes: Vec<&'a WorkflowNode>,
    edges: Vec<&'a WorkflowEdge>,
}

impl<'a> CanonicalDefinition<'a> {
    fn of(definition: &'a WorkflowDefinition) -> Self {
        let mut nodes: Vec<&WorkflowNode> = definition.nodes.iter().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        let mut edges: Vec<&WorkflowEdge> = definition.edges.iter().collect();
        edges.sort_by(|a, b| a.id.cmp(&b.id));

        Self {
            id: definition.id.as_str(),
            name: &definition.name,
            description: &definition.description,
            version: definition.version,
            nodes,
            edges,
        }
    }
}

/// Canonical JSON bytes of a definition
pub fn canonical_bytes(definition: &WorkflowDefinition) -> RegistryResult<Vec<u8>> {
    serde_json::to_vec(&CanonicalDefinition::of(definition))
        .map_err(|error| RegistrationError::Serialization(error.to_string()))
}

/// Content hash of a definition, insensitive to node and edge order
pub fn content_hash(definition: &WorkflowDefinition) -> RegistryResult<Digest> {
    let encoded = canonical_bytes(definition)?;
    Ok(FieldHasher::new(DEFINITION_DOMAIN).field(encoded).finish())
}
