//! Content checksums for compiled units and cache files.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 64-bit XXH3 checksum over a byte slice.
///
/// Stored as the trailer of every encoded compiled unit and in the header of
/// every snapshot file. A mismatch between the stored and recomputed value
/// means the bytes were truncated or corrupted on disk.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(u64);

impl Checksum {
    /// Computes the checksum of `data`.
    pub fn of(data: &[u8]) -> Self {
        Self(xxhash_rust::xxh3::xxh3_64(data))
    }

    /// Wraps a raw checksum value read from disk.
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value for serialization.
    pub fn as_raw(self) -> u64 {
        self.0
    }

    /// Returns the little-endian byte encoding.
    pub fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({self})")
    }
}
