//! The `stasis patch` command: install hooks into a unit file.

use std::borrow::Cow;
use std::path::PathBuf;

use stasis_patch::{patch_unit, HookTable};
use tracing::{debug, error};

use crate::{GlobalArgs, PatchArgs};

/// Runs the `stasis patch` command.
///
/// Units that are not hook targets, or cannot be patched, are written out
/// unchanged, mirroring what the host would load.
pub fn run(args: &PatchArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(&args.unit)
        .map_err(|e| format!("cannot read {}: {e}", args.unit.display()))?;

    let name = match &args.name {
        Some(n) => n.clone(),
        None => stasis_unit::decode(&bytes)
            .map_err(|e| format!("cannot decode {}: {e}", args.unit.display()))?
            .name,
    };

    let role = args.role.unwrap_or(global.config.session.role);
    let table = HookTable::for_role(role);

    let output: Cow<'_, [u8]> = match table.lookup(&name) {
        Some(spec) => match patch_unit(spec, &bytes) {
            Ok((patched, report)) => {
                if !global.quiet {
                    for (method, at) in &report.patched {
                        eprintln!("    Hooked {name}.{method} at instruction {at}");
                    }
                    for method in &report.unpatched {
                        eprintln!("   Skipped {name}.{method} (no exit point)");
                    }
                }
                Cow::Owned(patched)
            }
            Err(e) => {
                error!(unit = %name, "could not patch unit, leaving it unchanged: {e}");
                Cow::Borrowed(&bytes[..])
            }
        },
        None => {
            if !global.quiet {
                eprintln!("  Unchanged {name} is not a hook target for the {role} role");
            }
            Cow::Borrowed(&bytes[..])
        }
    };

    let out_path = args.output.clone().unwrap_or_else(|| {
        let mut p = args.unit.clone().into_os_string();
        p.push(".patched");
        PathBuf::from(p)
    });
    std::fs::write(&out_path, &output)
        .map_err(|e| format!("cannot write {}: {e}", out_path.display()))?;

    debug!(path = %out_path.display(), bytes = output.len(), "wrote unit");
    if !global.quiet {
        eprintln!("     Wrote {}", out_path.display());
    }
    Ok(0)
}
