//! Workflow Instance Ledger
//!
//! Every workflow instance is an append-only log of hash-chained step
//! records. The ledger enforces the pinned definition's policies on each
//! append (known node, actor role, evidence, timestamp order), links the
//! new record to the previous head, and re-derives the instance status.
//!
//! Appends are serialized per instance and never interleave. Instances
//! that fail an integrity check are halted until an operator releases
//! them; the ledger never repairs a chain.

#![deny(unsafe_code)]

mod error;
mod ledger;
mod step;

pub use error::{AppendError, AppendResult, LedgerError, LedgerResult};
pub use ledger::InstanceLedger;
pub use workflow_verifier::{RoleResolver, StaticRoleResolver};
pub use step::{HistoryPage, NewInstance, StepReport};
