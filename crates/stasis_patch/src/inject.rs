//! Hook call insertion.

use stasis_unit::{CompiledMethod, Instruction};
use tracing::{debug, warn};

/// What happened to one method during injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectOutcome {
    /// The call was inserted at this position, ahead of the anchor.
    Injected {
        /// Index of the inserted call in the updated sequence.
        at: usize,
    },
    /// The method had no exit instruction and was left unchanged.
    NoExitPoint,
}

/// Inserts `call` immediately before the instruction at `anchor`.
///
/// The anchor and everything after it shift forward by one; nothing else
/// moves and no existing instruction is changed. With no anchor (or one past
/// the end of the body) the method is left untouched and a warning naming
/// `unit` and the method is logged.
pub fn inject_hook(
    unit: &str,
    method: &mut CompiledMethod,
    anchor: Option<usize>,
    call: &Instruction,
) -> InjectOutcome {
    match anchor {
        Some(at) if at < method.instructions.len() => {
            method.instructions.insert(at, call.clone());
            debug!(unit, method = %method.name, at, "inserted hook call");
            InjectOutcome::Injected { at }
        }
        _ => {
            warn!(
                unit,
                method = %method.name,
                "could not transform {unit} properly: `{}` has no exit point for the hook",
                method.name
            );
            InjectOutcome::NoExitPoint
        }
    }
}
