//! Fingerprint records and the key index
//!
//! Records are stored as JSON:
//! - fingerprint under `"<window_size>:<file_name>"`: array of integer arrays
//! - key index under [`KEY_INDEX_KEY`]: array of key strings

use serde::{Deserialize, Serialize};
use std::fmt;

/// Store key of the record listing every fingerprint key
pub const KEY_INDEX_KEY: &str = "fft_keys";

/// Quantized spectrum of one analysis window
pub type FingerprintChunk = Vec<i32>;

/// Per-window quantized spectra of one file, in temporal order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint {
    chunks: Vec<FingerprintChunk>,
}

impl Fingerprint {
    pub fn new(chunks: Vec<FingerprintChunk>) -> Self {
        Self { chunks }
    }

    pub fn chunks(&self) -> &[FingerprintChunk] {
        &self.chunks
    }

    /// Number of windows
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Serialize for storage
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// Store key of one fingerprint: `"<window_size>:<file_name>"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FingerprintKey(String);

impl FingerprintKey {
    pub fn new(window_size: usize, file_name: &str) -> Self {
        Self(format!("{}:{}", window_size, file_name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FingerprintKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, duplicate-free list of every stored fingerprint key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyIndex {
    keys: Vec<FingerprintKey>,
}

impl KeyIndex {
    /// Append `key` unless already present
    ///
    /// Returns `false` when the key was already indexed.
    pub fn insert(&mut self, key: FingerprintKey) -> bool {
        if self.contains(&key) {
            return false;
        }
        self.keys.push(key);
        true
    }

    pub fn contains(&self, key: &FingerprintKey) -> bool {
        self.keys.contains(key)
    }

    pub fn keys(&self) -> &[FingerprintKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
