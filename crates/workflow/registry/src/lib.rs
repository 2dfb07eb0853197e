//! Workflow Definition Registry
//!
//! A versioned, append-only store of validated workflow definitions. Each
//! accepted draft is sealed into a [`RegisteredDefinition`] carrying a
//! BLAKE3 content hash over its canonical form; that hash, rendered with a
//! `0x` prefix, is the definition's contract address.
//!
//! [`RegisteredDefinition`]: workflow_types::RegisteredDefinition

#![deny(unsafe_code)]

pub mod canonical;
mod error;
mod registry;

pub use canonical::{canonical_bytes, content_hash};
pub use error::{RegistrationError, RegistryResult};
pub use registry::DefinitionRegistry;
