use thiserror::Error;
use workflow_ledger::{AppendError, LedgerError};
use workflow_registry::RegistrationError;
use workflow_types::{WorkflowDefinitionId, WorkflowInstanceId};

/// Errors surfaced at the service boundary
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Append(#[from] AppendError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("definition not found: {id}{}", .version.map(|v| format!(" v{}", v)).unwrap_or_default())]
    DefinitionNotFound {
        id: WorkflowDefinitionId,
        version: Option<u32>,
    },

    #[error("instance not found: {0}")]
    InstanceNotFound(WorkflowInstanceId),

    #[error("ledger task failed: {0}")]
    TaskFailed(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
