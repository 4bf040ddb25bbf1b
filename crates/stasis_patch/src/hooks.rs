//! The static hook table and the triggers its calls invoke.

use std::fmt;

use stasis_common::Role;
use stasis_unit::Instruction;

/// Call target of the hook fired once the active component list is fixed.
pub const FINALIZE_HOOK_TARGET: &str = "stasis/Hooks.afterComponentListFinalized";

/// Call target of the hook fired at the end of a successful startup.
pub const FINISH_HOOK_TARGET: &str = "stasis/Hooks.afterRunFinishedSuccessfully";

/// Unit whose component-list builder receives the finalize hook.
pub const LOADER_UNIT: &str = "host.loader.LoadController";
/// Method in [`LOADER_UNIT`] that builds the active component list.
pub const LOADER_METHOD: &str = "buildComponentList";

/// Unit that completes an interactive startup.
pub const INTERACTIVE_UNIT: &str = "host.client.ClientHandler";
/// Method in [`INTERACTIVE_UNIT`] that completes startup.
pub const INTERACTIVE_METHOD: &str = "finishLoading";

/// Unit that completes a headless startup.
pub const HEADLESS_UNIT: &str = "host.server.ServerHandler";
/// Method in [`HEADLESS_UNIT`] that completes startup.
pub const HEADLESS_METHOD: &str = "finishServerLoading";

/// One of the two host entry points into this subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// The host's active component list has just been fixed.
    ComponentListFinalized,
    /// The host finished startup without failing.
    RunFinishedSuccessfully,
}

impl Trigger {
    /// The call target the injected instruction names.
    pub fn call_target(self) -> &'static str {
        match self {
            Trigger::ComponentListFinalized => FINALIZE_HOOK_TARGET,
            Trigger::RunFinishedSuccessfully => FINISH_HOOK_TARGET,
        }
    }

    /// Maps an executed call target back to its trigger.
    pub fn from_call_target(target: &str) -> Option<Self> {
        match target {
            FINALIZE_HOOK_TARGET => Some(Trigger::ComponentListFinalized),
            FINISH_HOOK_TARGET => Some(Trigger::RunFinishedSuccessfully),
            _ => None,
        }
    }

    /// The call instruction that fires this trigger.
    pub fn call(self) -> Instruction {
        Instruction::call(self.call_target())
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::ComponentListFinalized => write!(f, "component list finalized"),
            Trigger::RunFinishedSuccessfully => write!(f, "run finished successfully"),
        }
    }
}

/// Where to install one hook: a unit, a method name, and the call to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookSpec {
    /// Name of the unit as presented by the host.
    pub unit: String,
    /// Name of the method(s) to patch.
    pub method: String,
    /// The trigger the inserted call fires.
    pub trigger: Trigger,
}

impl HookSpec {
    /// Creates a hook spec.
    pub fn new(unit: impl Into<String>, method: impl Into<String>, trigger: Trigger) -> Self {
        Self {
            unit: unit.into(),
            method: method.into(),
            trigger,
        }
    }

    /// The call instruction to insert.
    pub fn call(&self) -> Instruction {
        self.trigger.call()
    }
}

/// The two live hook entries for this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookTable {
    finalize: HookSpec,
    finish: HookSpec,
}

impl HookTable {
    /// Builds a table from explicit finalize and finish entries.
    pub fn new(finalize: HookSpec, finish: HookSpec) -> Self {
        Self { finalize, finish }
    }

    /// The default table for a role.
    ///
    /// The finalize entry is shared by both roles; only the unit that ends
    /// startup differs.
    pub fn for_role(role: Role) -> Self {
        let finalize = HookSpec::new(LOADER_UNIT, LOADER_METHOD, Trigger::ComponentListFinalized);
        let finish = match role {
            Role::Interactive => HookSpec::new(
                INTERACTIVE_UNIT,
                INTERACTIVE_METHOD,
                Trigger::RunFinishedSuccessfully,
            ),
            Role::Headless => HookSpec::new(
                HEADLESS_UNIT,
                HEADLESS_METHOD,
                Trigger::RunFinishedSuccessfully,
            ),
        };
        Self { finalize, finish }
    }

    /// Returns the entry for `unit`, if any.
    pub fn lookup(&self, unit: &str) -> Option<&HookSpec> {
        self.entries().find(|spec| spec.unit == unit)
    }

    /// Iterates both entries, finalize first.
    pub fn entries(&self) -> impl Iterator<Item = &HookSpec> {
        [&self.finalize, &self.finish].into_iter()
    }
}
