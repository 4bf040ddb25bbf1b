//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur during cache operations.
///
/// None of these reach the host. Load errors collapse into "no prior
/// snapshot", staging errors leave nothing staged, and commit errors leave the
/// canonical file as it was.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A snapshot file has an invalid or missing header.
    #[error("invalid snapshot header in {path}: {reason}")]
    InvalidHeader {
        /// The snapshot file path.
        path: PathBuf,
        /// Description of the header problem.
        reason: String,
    },

    /// The stored checksum does not match the computed checksum of the payload.
    #[error("checksum mismatch in {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The snapshot file path.
        path: PathBuf,
        /// The checksum stored in the header.
        expected: String,
        /// The checksum computed from the payload.
        actual: String,
    },

    /// The snapshot format version does not match the current version.
    #[error("version mismatch in {path}: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The snapshot file path.
        path: PathBuf,
        /// The expected format version.
        expected: u32,
        /// The format version found in the file.
        actual: u32,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

impl CacheError {
    /// Returns `true` if the error is a missing file rather than a bad one.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CacheError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}
