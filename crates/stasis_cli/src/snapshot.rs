//! The `stasis snapshot` command: print a component cache file.

use std::path::Path;

use stasis_cache::ComponentSnapshot;

/// Runs the `stasis snapshot` command.
pub fn run(path: &Path, json: bool) -> Result<i32, Box<dyn std::error::Error>> {
    let snapshot = ComponentSnapshot::load(path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", render(&snapshot));
    }
    Ok(0)
}

fn render(snapshot: &ComponentSnapshot) -> String {
    snapshot
        .iter()
        .map(|(id, version)| format!("{id} = {version}\n"))
        .collect()
}
