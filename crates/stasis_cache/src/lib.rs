//! Component snapshot cache.
//!
//! At the "component list finalized" trigger the host's active components are
//! captured as an id → version map and compared with the snapshot left by the
//! previous run. A differing snapshot is staged to a temporary file and only
//! replaces the canonical cache file at the "run finished successfully"
//! trigger, so a run that crashes during startup never leaves a cache behind
//! that claims it succeeded.

#![warn(missing_docs)]

pub mod error;
pub mod session;
pub mod snapshot;

pub use error::CacheError;
pub use session::{CacheSettings, CommitOutcome, SessionContext, Stage, DEFAULT_CACHE_FILE};
pub use snapshot::{ActiveComponent, ComponentSnapshot};
