//! BLAKE3 digests for content addresses and step chains
//!
//! Every hash in the system is a 32-byte BLAKE3 digest computed through a
//! [`FieldHasher`], which separates domains with a prefix and encodes each
//! field with its length so that field boundaries cannot be shifted.

use crate::DigestError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A 32-byte digest, rendered as lowercase hex
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

impl Digest {
    /// The `previous_hash` of the first step record in every instance
    pub const GENESIS: Digest = Digest([0; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a digest from hex, with or without a `0x` prefix
    pub fn from_hex(value: &str) -> Result<Self, DigestError> {
        let trimmed = value.strip_prefix("0x").unwrap_or(value);
        let bytes = hex::decode(trimmed).map_err(|e| DigestError::InvalidHex(e.to_string()))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|bytes: Vec<u8>| DigestError::InvalidLength(bytes.len()))?;
        Ok(Self(array))
    }

    /// The `0x`-prefixed form used as a definition's contract address
    pub fn address(&self) -> String {
        format!("0x{}", self.to_hex())
    }

    pub fn is_genesis(&self) -> bool {
        *self == Self::GENESIS
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::fmt::Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Digest({})", &self.to_hex()[..16])
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Digest::from_hex(&value).map_err(serde::de::Error::custom)
    }
}

/// Domain-separated, length-prefixed BLAKE3 hasher
pub struct FieldHasher {
    hasher: blake3::Hasher,
}

impl FieldHasher {
    pub fn new(domain: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain.as_bytes());
        hasher.update(b":");
        Self { hasher }
    }

    /// Append one field, prefixed with its byte length
    pub fn field(&mut self, bytes: impl AsRef<[u8]>) -> &mut Self {
        let bytes = bytes.as_ref();
        self.hasher.update(&(bytes.len() as u64).to_le_bytes());
        self.hasher.update(bytes);
        self
    }

    /// Append an optional field; absence and an empty value hash differently
    pub fn optional_field(&mut self, value: Option<impl AsRef<[u8]>>) -> &mut Self {
        match value {
            Some(bytes) => {
                self.hasher.update(&[1]);
                self.field(bytes)
            }
            None => {
                self.hasher.update(&[0]);
                self
            }
        }
    }

    pub fn finish(&self) -> Digest {
        Digest(*self.hasher.finalize().as_bytes())
    }
}
