//! Definition registry: the append-only catalog of sealed definitions
//!
//! Definitions are immutable once registered. To modify one, register a
//! new version under the same id. There is no update or delete.

use crate::canonical::content_hash;
use crate::{RegistrationError, RegistryResult};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use workflow_types::{RegisteredDefinition, WorkflowDefinition, WorkflowDefinitionId};
use workflow_validator::{validate, ValidationResult};

type Versions = BTreeMap<u32, Arc<RegisteredDefinition>>;

/// Registry of workflow definitions, keyed by id then version
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    definitions: DashMap<WorkflowDefinitionId, Versions>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate, hash, and seal a draft.
    ///
    /// Validation and hashing run before any lock is taken. The version
    /// check and the insert then happen under the entry lock for this id,
    /// so two racing registrations of the same version cannot both win.
    pub fn register(
        &self,
        definition: WorkflowDefinition,
    ) -> RegistryResult<Arc<RegisteredDefinition>> {
        if let ValidationResult::Invalid(violations) = validate(&definition) {
            tracing::warn!(
                definition_id = %definition.id,
                version = definition.version,
                violations = violations.len(),
                "Workflow definition rejected"
            );
            return Err(RegistrationError::ValidationFailed(violations));
        }

        let hash = content_hash(&definition)?;
        let id = definition.id.clone();
        let version = definition.version;
        let sealed = Arc::new(RegisteredDefinition::seal(definition, hash, Utc::now()));

        match self.definitions.entry(id.clone()) {
            Entry::Occupied(mut entry) => {
                if let Some(&latest) = entry.get().keys().next_back() {
                    if version <= latest {
                        tracing::warn!(
                            definition_id = %id,
                            version,
                            latest,
                            "Workflow definition version conflict"
                        );
                        return Err(RegistrationError::VersionConflict {
                            id,
                            version,
                            latest,
                        });
                    }
                }
                entry.get_mut().insert(version, sealed.clone());
            }
            Entry::Vacant(entry) => {
                entry.insert(BTreeMap::from([(version, sealed.clone())]));
            }
        }

        tracing::info!(
            definition_id = %id,
            version,
            content_hash = %hash,
            "Workflow definition registered"
        );
        Ok(sealed)
    }

    /// Get one version of a definition
    pub fn get(
        &self,
        id: &WorkflowDefinitionId,
        version: u32,
    ) -> Option<Arc<RegisteredDefinition>> {
        self.definitions
            .get(id)
            .and_then(|versions| versions.get(&version).cloned())
    }

    /// Get the highest registered version of a definition
    pub fn latest(&self, id: &WorkflowDefinitionId) -> Option<Arc<RegisteredDefinition>> {
        self.definitions
            .get(id)
            .and_then(|versions| versions.values().next_back().cloned())
    }

    /// All versions of a definition, oldest first
    pub fn versions(&self, id: &WorkflowDefinitionId) -> Vec<Arc<RegisteredDefinition>> {
        self.definitions
            .get(id)
            .map(|versions| versions.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Latest version of every definition, ordered by id
    pub fn list(&self) -> Vec<Arc<RegisteredDefinition>> {
        let mut latest: Vec<_> = self
            .definitions
            .iter()
            .filter_map(|entry| entry.value().values().next_back().cloned())
            .collect();
        latest.sort_by(|a, b| a.id().cmp(b.id()));
        latest
    }

    /// Number of registered (id, version) pairs
    pub fn count(&self) -> usize {
        self.definitions.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn contains(&self, id: &WorkflowDefinitionId, version: u32) -> bool {
        self.definitions
            .get(id)
            .map(|versions| versions.contains_key(&version))
            .unwrap_or(false)
    }
}
