//! Exit-point scanning.

use stasis_unit::Instruction;

/// Returns the position of the last `Return` in `instructions`.
///
/// Only one anchor is ever reported per body, so at most one hook call is
/// inserted no matter how many exits the method has. Earlier returns (early
/// exits on other branches) bypass the hook. `None` means the body has no
/// return at all, as with abstract or native methods.
pub fn find_last_exit(instructions: &[Instruction]) -> Option<usize> {
    let mut last = None;
    for (pos, insn) in instructions.iter().enumerate() {
        if insn.is_return() {
            last = Some(pos);
        }
    }
    last
}
