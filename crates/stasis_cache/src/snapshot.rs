//! Component snapshots and their on-disk encoding.
//!
//! A snapshot file is a 4-byte little-endian header length, a bincode header
//! (magic, format version, payload checksum), and the bincode-encoded map. The
//! map is a `BTreeMap`, so the same snapshot always encodes to the same bytes.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use stasis_common::Checksum;
use tempfile::NamedTempFile;

use crate::error::CacheError;

/// Magic bytes identifying a snapshot file.
const SNAPSHOT_MAGIC: [u8; 4] = *b"SNAP";

/// Current snapshot format version. Increment on breaking changes to the
/// header or payload format.
const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Prefix of staged snapshot files.
pub(crate) const STAGE_PREFIX: &str = "componentscache";
pub(crate) const STAGE_SUFFIX: &str = ".tmp";

/// One component the host reports as active for this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveComponent {
    /// Unique component identifier.
    pub id: String,
    /// Component version string.
    pub version: String,
}

impl ActiveComponent {
    /// Creates an active component entry.
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
        }
    }
}

/// Header prepended to every snapshot file for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotHeader {
    magic: [u8; 4],
    format_version: u32,
    checksum: u64,
}

/// A point-in-time map of component id to version.
///
/// Equality is exact map equality: same ids, same version for each id,
/// regardless of the order in which entries were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSnapshot {
    components: BTreeMap<String, String>,
}

impl ComponentSnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the active component list.
    ///
    /// Ids are expected to be unique; when one repeats, the later entry wins.
    pub fn capture<'a>(components: impl IntoIterator<Item = &'a ActiveComponent>) -> Self {
        let mut snapshot = Self::new();
        for c in components {
            snapshot.insert(c.id.clone(), c.version.clone());
        }
        snapshot
    }

    /// Records `version` for `id`, replacing any earlier version.
    pub fn insert(&mut self, id: impl Into<String>, version: impl Into<String>) {
        self.components.insert(id.into(), version.into());
    }

    /// Returns the recorded version of `id`.
    pub fn version_of(&self, id: &str) -> Option<&str> {
        self.components.get(id).map(String::as_str)
    }

    /// Number of components in the snapshot.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns `true` if the snapshot holds no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Iterates `(id, version)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.components
            .iter()
            .map(|(id, v)| (id.as_str(), v.as_str()))
    }

    /// Encodes the snapshot with its validation header.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CacheError> {
        let payload = bincode::serde::encode_to_vec(&self.components, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;

        let header = SnapshotHeader {
            magic: SNAPSHOT_MAGIC,
            format_version: SNAPSHOT_FORMAT_VERSION,
            checksum: Checksum::of(&payload).as_raw(),
        };
        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;

        let header_len = header_bytes.len() as u32;
        let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
        output.extend_from_slice(&header_len.to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(&payload);
        Ok(output)
    }

    /// Loads and validates a snapshot file.
    ///
    /// Missing, unreadable, and corrupt files are all errors; callers treat
    /// any of them as "no usable prior snapshot".
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let raw = std::fs::read(path).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_bytes(path, &raw)
    }

    fn from_bytes(path: &Path, raw: &[u8]) -> Result<Self, CacheError> {
        let invalid = |reason: &str| CacheError::InvalidHeader {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        if raw.len() < 4 {
            return Err(invalid("file shorter than header length prefix"));
        }
        let header_len = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
        if raw.len() - 4 < header_len {
            return Err(invalid("header length exceeds file size"));
        }

        let (header, _): (SnapshotHeader, usize) = bincode::serde::decode_from_slice(
            &raw[4..4 + header_len],
            bincode::config::standard(),
        )
        .map_err(|e| invalid(&e.to_string()))?;

        if header.magic != SNAPSHOT_MAGIC {
            return Err(invalid("missing magic bytes"));
        }
        if header.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(CacheError::VersionMismatch {
                path: path.to_path_buf(),
                expected: SNAPSHOT_FORMAT_VERSION,
                actual: header.format_version,
            });
        }

        let payload = &raw[4 + header_len..];
        let stored = Checksum::from_raw(header.checksum);
        let actual = Checksum::of(payload);
        if actual != stored {
            return Err(CacheError::ChecksumMismatch {
                path: path.to_path_buf(),
                expected: stored.to_string(),
                actual: actual.to_string(),
            });
        }

        let (components, read): (BTreeMap<String, String>, usize) =
            bincode::serde::decode_from_slice(payload, bincode::config::standard()).map_err(
                |e| CacheError::Serialization {
                    reason: e.to_string(),
                },
            )?;
        if read != payload.len() {
            return Err(CacheError::Serialization {
                reason: format!("{} unread bytes after snapshot", payload.len() - read),
            });
        }

        Ok(Self { components })
    }

    /// Writes the snapshot to a new temporary file in `dir` and flushes it to
    /// storage.
    ///
    /// The returned handle deletes the file when dropped unless it is
    /// persisted first.
    pub fn stage_in(&self, dir: &Path) -> Result<NamedTempFile, CacheError> {
        let bytes = self.to_bytes()?;
        let io_err = |path: &Path, e: std::io::Error| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        };

        let mut file = tempfile::Builder::new()
            .prefix(STAGE_PREFIX)
            .suffix(STAGE_SUFFIX)
            .tempfile_in(dir)
            .map_err(|e| io_err(dir, e))?;
        file.write_all(&bytes).map_err(|e| io_err(file.path(), e))?;
        file.as_file().sync_all().map_err(|e| io_err(file.path(), e))?;
        Ok(file)
    }
}
