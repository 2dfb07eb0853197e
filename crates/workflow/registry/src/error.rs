use thiserror::Error;
use workflow_types::WorkflowDefinitionId;
use workflow_validator::Violation;

/// Errors returned when a definition cannot be registered
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("definition failed validation with {} violation(s)", .0.len())]
    ValidationFailed(Vec<Violation>),

    #[error("definition {id} version {version} must be greater than registered version {latest}")]
    VersionConflict {
        id: WorkflowDefinitionId,
        version: u32,
        latest: u32,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type RegistryResult<T> = Result<T, RegistrationError>;
