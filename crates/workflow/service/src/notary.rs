//! Notary collaborator: anchors hashes on an external immutable log
//!
//! Anchoring is best-effort. The service calls the notary from a spawned
//! task after the local operation has already returned, so a slow or
//! failing notary never blocks registration or append.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use workflow_types::Digest;

/// Where a hash was anchored
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalReference {
    pub hash: Digest,
    /// Notary-specific locator (transaction id, log index, ...)
    pub reference: String,
    pub anchored_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotaryError {
    #[error("notary unavailable: {0}")]
    Unavailable(String),

    #[error("notary rejected anchor: {0}")]
    Rejected(String),
}

/// External anchoring service
#[async_trait]
pub trait Notary: Send + Sync {
    async fn anchor(&self, hash: Digest) -> Result<ExternalReference, NotaryError>;
}

/// In-process notary keeping an append-only list of anchored hashes
#[derive(Debug, Default)]
pub struct LocalNotary {
    log: Mutex<Vec<Digest>>,
}

impl LocalNotary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hashes anchored so far, in anchoring order
    pub fn anchored(&self) -> Vec<Digest> {
        self.log.lock().clone()
    }
}

#[async_trait]
impl Notary for LocalNotary {
    async fn anchor(&self, hash: Digest) -> Result<ExternalReference, NotaryError> {
        let mut log = self.log.lock();
        log.push(hash);
        Ok(ExternalReference {
            hash,
            reference: format!("local:{}", log.len() - 1),
            anchored_at: Utc::now(),
        })
    }
}
