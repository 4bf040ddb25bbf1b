//! Host integration for stasis.
//!
//! A host owns one [`Lifecycle`] per process. It routes every unit it loads
//! through [`Lifecycle::transform`], and when the patched code executes one of
//! the injected calls it forwards the call target to
//! [`Lifecycle::dispatch_call`], which runs the matching trigger against the
//! component cache.

#![warn(missing_docs)]

pub mod host;
pub mod lifecycle;

pub use host::Host;
pub use lifecycle::{cache_settings, Lifecycle};
