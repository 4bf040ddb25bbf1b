//! Routing of host units to the patching pipeline.

use std::borrow::Cow;

use stasis_common::Role;
use stasis_unit::{decode, encode, UnitError};
use tracing::{error, info};

use crate::hooks::{HookSpec, HookTable};
use crate::inject::{inject_hook, InjectOutcome};
use crate::scan::find_last_exit;

/// Per-unit summary of what the transformer did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    /// Methods that received the hook, with the insertion index.
    pub patched: Vec<(String, usize)>,
    /// Methods that matched by name but had no exit point.
    pub unpatched: Vec<String>,
}

impl PatchReport {
    /// Number of methods that matched the target name.
    pub fn matched(&self) -> usize {
        self.patched.len() + self.unpatched.len()
    }
}

/// Installs hooks into the units named by a [`HookTable`].
///
/// Holds no per-call state, so presenting the same unit bytes twice yields
/// the same output twice.
#[derive(Debug, Clone)]
pub struct Transformer {
    table: HookTable,
}

impl Transformer {
    /// Creates a transformer over an explicit table.
    pub fn new(table: HookTable) -> Self {
        Self { table }
    }

    /// Creates a transformer with the default table for `role`.
    pub fn for_role(role: Role) -> Self {
        Self::new(HookTable::for_role(role))
    }

    /// The table this transformer routes by.
    pub fn table(&self) -> &HookTable {
        &self.table
    }

    /// Transforms one unit presented by the host.
    ///
    /// Units not in the table are returned borrowed and unchanged. A unit
    /// that cannot be decoded or re-encoded is logged and also returned
    /// unchanged; this never fails.
    pub fn transform<'a>(&self, name: &str, bytes: &'a [u8]) -> Cow<'a, [u8]> {
        let Some(spec) = self.table.lookup(name) else {
            return Cow::Borrowed(bytes);
        };

        match patch_unit(spec, bytes) {
            Ok((patched, report)) => {
                info!(
                    unit = name,
                    method = %spec.method,
                    patched = report.patched.len(),
                    unpatched = report.unpatched.len(),
                    "installed {} hook",
                    spec.trigger
                );
                Cow::Owned(patched)
            }
            Err(e) if e.is_decode() => {
                error!(unit = name, "could not decode unit, leaving it unpatched: {e}");
                Cow::Borrowed(bytes)
            }
            Err(e) => {
                error!(unit = name, "could not re-encode unit, leaving it unpatched: {e}");
                Cow::Borrowed(bytes)
            }
        }
    }
}

/// Decodes `bytes`, injects the hook into every method named by `spec`, and
/// re-encodes.
///
/// Methods without an exit point are reported but do not fail the unit.
pub fn patch_unit(spec: &HookSpec, bytes: &[u8]) -> Result<(Vec<u8>, PatchReport), UnitError> {
    let mut unit = decode(bytes)?;
    let call = spec.call();
    let mut report = PatchReport::default();

    let targets = unit.find_methods(&spec.method);
    if targets.is_empty() {
        info!(unit = %unit.name, method = %spec.method, "no method with this name to patch");
    }

    for id in targets {
        let Some(method) = unit.method_mut(id) else {
            continue;
        };
        let anchor = find_last_exit(&method.instructions);
        match inject_hook(&spec.unit, method, anchor, &call) {
            InjectOutcome::Injected { at } => report.patched.push((method.name.clone(), at)),
            InjectOutcome::NoExitPoint => report.unpatched.push(method.name.clone()),
        }
    }

    Ok((encode(&unit)?, report))
}
