//! Shared foundational types used across the stasis workspace.
//!
//! This crate provides the content checksum used to validate compiled units and
//! cache files, and the execution [`Role`] that selects which startup path the
//! host runs.

#![warn(missing_docs)]

pub mod checksum;
pub mod role;

pub use checksum::Checksum;
pub use role::{ParseRoleError, Role};
