//! The `stasis run` command: simulate one host startup against the component cache.

use std::path::Path;

use serde::Deserialize;
use stasis_cache::{ActiveComponent, CommitOutcome};
use stasis_host::Lifecycle;

use crate::{GlobalArgs, RunArgs};

/// Active component list file: a sequence of `[[component]]` tables.
#[derive(Debug, Deserialize)]
struct ComponentList {
    #[serde(default)]
    component: Vec<ActiveComponent>,
}

/// Runs the `stasis run` command.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let components = load_components(&args.components)?;

    let mut config = global.config.clone();
    if let Some(role) = args.role {
        config.session.role = role;
    }

    let mut lifecycle = Lifecycle::from_config(components, &config);
    lifecycle.after_component_list_finalized();

    if let Some(session) = lifecycle.session() {
        if !global.quiet {
            eprintln!("     Cache {}", session.cache_file().display());
            if let Some(temp) = session.temp_cache_file() {
                eprintln!("    Staged {}", temp.display());
            }
        }
        println!(
            "consistent: {}",
            if session.is_consistent() { "yes" } else { "no" }
        );
    }

    if args.crash {
        if !global.quiet {
            eprintln!("   Stopped before startup finished; cache left as it was");
        }
        return Ok(0);
    }

    let outcome = lifecycle.after_run_finished_successfully();
    if !global.quiet {
        let msg = match outcome {
            Some(CommitOutcome::Unchanged) => "cache already up to date",
            Some(CommitOutcome::Committed) => "cache committed",
            Some(CommitOutcome::NothingStaged) => "nothing staged; cache not updated",
            Some(CommitOutcome::Failed) => "commit failed; cache left as it was",
            None => "no cache session",
        };
        eprintln!("  Finished {msg}");
    }
    Ok(0)
}

fn load_components(path: &Path) -> Result<Vec<ActiveComponent>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let list: ComponentList =
        toml::from_str(&content).map_err(|e| format!("invalid component list: {e}"))?;
    Ok(list.component)
}
