//! Parsing and validation of `stasis.toml` configuration files.
//!
//! The configuration fixes the process [`Role`](stasis_common::Role), the host
//! home directory, and where the component cache lives. Every field has a
//! default, so an empty file is a valid configuration.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE};
pub use types::*;
