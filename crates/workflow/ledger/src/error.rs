use chrono::{DateTime, Utc};
use thiserror::Error;
use workflow_types::{InstanceStatus, NodeId, WorkflowDefinitionId, WorkflowInstanceId};

/// Why a step could not be appended.
///
/// Every variant is recoverable by the caller and none of them touches the
/// stored chain, except [`AppendError::IntegrityHalted`], which reports an
/// instance frozen after a failed verification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppendError {
    #[error("instance not found: {0}")]
    InstanceNotFound(WorkflowInstanceId),

    #[error("instance {0} is halted after an integrity failure")]
    IntegrityHalted(WorkflowInstanceId),

    #[error("instance {instance_id} is {status} and accepts no further steps")]
    InstanceTerminal {
        instance_id: WorkflowInstanceId,
        status: InstanceStatus,
    },

    #[error("node {0} does not exist in the pinned definition")]
    UnknownNode(NodeId),

    #[error("actor {actor} holds none of the roles required by {node_id}: {}", .required.join(", "))]
    UnauthorizedActor {
        actor: String,
        node_id: NodeId,
        required: Vec<String>,
    },

    #[error("node {0} requires an evidence hash")]
    MissingEvidence(NodeId),

    #[error("node {0} does not accept an evidence hash")]
    UnexpectedEvidence(NodeId),

    #[error("timestamp {attempted} is earlier than the previous step at {previous}")]
    TimestampRegression {
        previous: DateTime<Utc>,
        attempted: DateTime<Utc>,
    },

    #[error("instance {0} is busy with another append; retry")]
    Busy(WorkflowInstanceId),
}

impl AppendError {
    /// Stable name of the error kind, for logs and CLI output
    pub fn kind(&self) -> &'static str {
        match self {
            AppendError::InstanceNotFound(_) => "instance_not_found",
            AppendError::IntegrityHalted(_) => "integrity_halted",
            AppendError::InstanceTerminal { .. } => "instance_terminal",
            AppendError::UnknownNode(_) => "unknown_node",
            AppendError::UnauthorizedActor { .. } => "unauthorized_actor",
            AppendError::MissingEvidence(_) => "missing_evidence",
            AppendError::UnexpectedEvidence(_) => "unexpected_evidence",
            AppendError::TimestampRegression { .. } => "timestamp_regression",
            AppendError::Busy(_) => "busy",
        }
    }
}

/// Errors from ledger operations other than append
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("instance not found: {0}")]
    InstanceNotFound(WorkflowInstanceId),

    #[error("instance already exists: {0}")]
    DuplicateInstance(WorkflowInstanceId),

    #[error("instance pins {expected_id} v{expected_version}, not {actual_id} v{actual_version}")]
    DefinitionMismatch {
        expected_id: WorkflowDefinitionId,
        expected_version: u32,
        actual_id: WorkflowDefinitionId,
        actual_version: u32,
    },
}

pub type LedgerResult<T> = Result<T, LedgerError>;
pub type AppendResult<T> = Result<T, AppendError>;
