//! Error types for the workflow data layer

/// Errors raised while parsing a [`crate::Digest`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DigestError {
    #[error("invalid hex digest: {0}")]
    InvalidHex(String),

    #[error("digest must be 32 bytes, got {0}")]
    InvalidLength(usize),
}
