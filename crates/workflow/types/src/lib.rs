//! Workflow Domain Types
//!
//! A workflow is a directed process graph that business actors walk
//! through, one recorded step at a time. This crate holds the data that
//! every other layer shares:
//!
//! - **WorkflowDefinition**: a draft graph of typed nodes and edges, owned
//!   by the editor until it is registered.
//! - **RegisteredDefinition**: a definition sealed with its content hash.
//!   It can no longer change; a new version must be registered instead.
//! - **GraphIndex**: O(1) node/edge lookup and O(deg) neighbour traversal
//!   over a definition. It never rejects malformed input.
//! - **WorkflowInstance**: one execution of a registered definition, kept
//!   as an append-only list of hash-chained **WorkflowStepRecord**s.
//! - **Digest**: the 32-byte BLAKE3 digest used for content addresses and
//!   chain links.

#![deny(unsafe_code)]

mod definition;
mod edge;
mod errors;
mod graph;
mod hash;
mod ids;
mod instance;
mod step;

pub use definition::*;
pub use edge::*;
pub use errors::*;
pub use graph::*;
pub use hash::*;
pub use ids::*;
pub use instance::*;
pub use step::*;
