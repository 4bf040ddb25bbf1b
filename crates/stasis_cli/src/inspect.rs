//! The `stasis inspect` command: print a decoded unit.

use std::fmt::Write as _;
use std::path::Path;

use stasis_unit::CompiledUnit;

/// Runs the `stasis inspect` command.
pub fn run(path: &Path) -> Result<i32, Box<dyn std::error::Error>> {
    let bytes =
        std::fs::read(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let unit = stasis_unit::decode(&bytes)
        .map_err(|e| format!("cannot decode {}: {e}", path.display()))?;
    print!("{}", render(&unit));
    Ok(0)
}

fn render(unit: &CompiledUnit) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "unit {} ({} methods)", unit.name, unit.methods.len());
    for method in &unit.methods {
        let _ = writeln!(
            out,
            "  method {} flags=0x{:04x} ({} instructions)",
            method.name,
            method.flags,
            method.instructions.len()
        );
        for (i, insn) in method.instructions.iter().enumerate() {
            let _ = writeln!(out, "    {i:04}  {insn}");
        }
    }
    out
}
