//! Configuration types deserialized from `stasis.toml`.

use std::path::PathBuf;

use serde::Deserialize;
use stasis_common::Role;

/// The top-level configuration parsed from `stasis.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StasisConfig {
    /// Process-wide session settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Component cache location.
    #[serde(default)]
    pub cache: CacheConfig,
}

impl StasisConfig {
    /// The canonical cache directory: `session.home` joined with `cache.dir`.
    pub fn cache_dir(&self) -> PathBuf {
        self.session.home.join(&self.cache.dir)
    }

    /// The canonical cache file inside [`StasisConfig::cache_dir`].
    pub fn cache_file(&self) -> PathBuf {
        self.cache_dir().join(&self.cache.file)
    }
}

/// Settings resolved once at process start.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Which startup path the host runs.
    #[serde(default)]
    pub role: Role,
    /// Host home directory; relative cache paths resolve against it.
    #[serde(default = "default_home")]
    pub home: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            role: Role::default(),
            home: default_home(),
        }
    }
}

/// Where the component cache lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Cache directory, relative to the home directory.
    #[serde(default = "default_cache_dir")]
    pub dir: String,
    /// Cache file name inside the cache directory.
    #[serde(default = "default_cache_file")]
    pub file: String,
    /// Stage snapshots next to the cache file. When `false`, the system
    /// temporary directory is used and the commit may fail across filesystems.
    #[serde(default = "default_true")]
    pub stage_in_cache_dir: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            file: default_cache_file(),
            stage_in_cache_dir: true,
        }
    }
}

fn default_home() -> PathBuf {
    PathBuf::from(".")
}

fn default_cache_dir() -> String {
    "caches".to_string()
}

fn default_cache_file() -> String {
    "components.bin".to_string()
}

fn default_true() -> bool {
    true
}
