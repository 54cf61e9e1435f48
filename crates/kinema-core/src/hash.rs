//! Content hashing for deterministic output verification.
//!
//! Produces a SHA-256 hash of serialized frame data, so the same scene
//! replayed on the same engine version can be checked bit for bit.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::KinemaResult;

/// A content hash digest (SHA-256, 32 bytes).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash {
    bytes: [u8; 32],
}

impl ContentHash {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Incremental hasher over a sequence of serializable records.
#[derive(Default)]
pub struct SequenceHasher {
    hasher: Sha256,
    count: u64,
}

impl SequenceHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one record; records are length-prefixed so boundaries are part of the hash.
    pub fn update<T: Serialize>(&mut self, record: &T) -> KinemaResult<()> {
        let bytes = serde_json::to_vec(record)?;
        self.hasher.update((bytes.len() as u64).to_le_bytes());
        self.hasher.update(&bytes);
        self.count += 1;
        Ok(())
    }

    /// Number of records fed so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn finish(self) -> ContentHash {
        let mut hasher = self.hasher;
        // Include record count
        hasher.update(self.count.to_le_bytes());
        finalize(hasher)
    }
}

/// Compute the content hash of a single serializable value.
pub fn hash_value<T: Serialize>(value: &T) -> KinemaResult<ContentHash> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(value)?);
    Ok(finalize(hasher))
}

fn finalize(hasher: Sha256) -> ContentHash {
    let result = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&result);
    ContentHash::from_bytes(bytes)
}
