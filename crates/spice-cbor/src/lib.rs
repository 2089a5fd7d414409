//! Canonical CBOR encoding and the SHA-256 content hash used to identify pods.

use serde::Serialize;
use serde_cbor::ser::{Serializer, Write as CborWrite};
use sha2::{Digest, Sha256};
use std::fmt;

/// Width of a rendered hash in hex characters.
pub const HASH_HEX_LEN: usize = 64;

/// Serialize a value into canonical CBOR bytes.
///
/// Structs are emitted in field declaration order and sequences in element
/// order. Callers that need ordered key/value data must pass it as a sequence
/// of pairs; CBOR maps are only as ordered as the source collection.
pub fn to_canonical_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_cbor::Error> {
    let mut buf = Vec::with_capacity(256);
    write_canonical_cbor(value, &mut buf)?;
    Ok(buf)
}

/// Serialize a value directly into a CBOR writer using canonical settings.
pub fn write_canonical_cbor<T: Serialize, W>(value: &T, writer: W) -> Result<(), serde_cbor::Error>
where
    W: CborWrite,
{
    let mut serializer = Serializer::new(writer);
    serializer.self_describe()?;
    value.serialize(&mut serializer)
}

/// A 32-byte SHA-256 digest rendered as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Hash the canonical CBOR encoding of a value.
    pub fn of_cbor<T: Serialize>(value: &T) -> Result<Self, serde_cbor::Error> {
        Ok(Self::of_bytes(&to_canonical_cbor(value)?))
    }

    pub fn of_bytes(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&digest);
        Hash(arr)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Fixed-width, lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse the 64-character hex form. Uppercase digits are accepted.
    pub fn from_hex_str(s: &str) -> Result<Self, HashParseError> {
        let trimmed = s.trim();
        if trimmed.len() != HASH_HEX_LEN {
            return Err(HashParseError::InvalidLength(trimmed.len()));
        }
        let mut buf = [0u8; 32];
        hex::decode_to_slice(trimmed, &mut buf)?;
        Ok(Hash(buf))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HashLengthError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| HashLengthError(bytes.len()))?;
        Ok(Hash(arr))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hash").field(&self.to_hex()).finish()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; 32]> for Hash {
    fn from(value: [u8; 32]) -> Self {
        Hash(value)
    }
}

impl TryFrom<&str> for Hash {
    type Error = HashParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Hash::from_hex_str(value)
    }
}

impl std::str::FromStr for Hash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hash::from_hex_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HashParseError {
    #[error("hash hex length must be {HASH_HEX_LEN}, got {0}")]
    InvalidLength(usize),
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

#[derive(Debug, thiserror::Error)]
#[error("hash must be 32 bytes, got {0}")]
pub struct HashLengthError(pub usize);
