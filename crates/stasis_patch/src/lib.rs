//! Hook installation into compiled host units.
//!
//! The host presents every unit it loads to a [`Transformer`]. Units named in
//! the [`HookTable`] are decoded, every method with the target name gets a call
//! to the hook inserted just before its last exit, and the unit is re-encoded.
//! Everything else passes through untouched.

#![warn(missing_docs)]

pub mod hooks;
pub mod inject;
pub mod scan;
pub mod transformer;

pub use hooks::{HookSpec, HookTable, Trigger};
pub use inject::{inject_hook, InjectOutcome};
pub use scan::find_last_exit;
pub use transformer::{patch_unit, PatchReport, Transformer};
