//! Workflow Proof Service
//!
//! One boundary over the definition registry, the instance ledger, and the
//! verifier:
//!
//! ```text
//! editor ──submit_definition──▶ DefinitionRegistry ──▶ RegisteredDefinition
//!                                                           │ pinned
//! actor  ──report_step────────▶ InstanceLedger ◀────────────┘
//!                                     │
//! viewer ──get_report─────────────────▶ verifier ──▶ VerificationReport
//! ```
//!
//! Content hashes and terminal chain hashes are optionally anchored with an
//! external [`Notary`]. Anchoring runs in the background and never blocks or
//! fails the operation that triggered it.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod notary;
pub mod service;
pub mod telemetry;

pub use config::{HistoryConfig, LedgerConfig, LoggingConfig, NotaryConfig, ServiceConfig};
pub use error::{ServiceError, ServiceResult};
pub use notary::{ExternalReference, LocalNotary, Notary, NotaryError};
pub use service::WorkflowService;

pub use workflow_ledger::{
    AppendError, HistoryPage, LedgerError, NewInstance, RoleResolver, StaticRoleResolver,
    StepReport,
};
pub use workflow_registry::RegistrationError;
pub use workflow_validator::{validate, ValidationResult, Violation, ViolationKind};
pub use workflow_verifier::{
    PolicyFault, PolicyViolation, RecordFault, SlaBreach, VerificationReport, ViolationReason,
};
