//! stasis CLI: inspect and patch compiled units, and exercise the component cache.
//!
//! Provides `stasis patch` to install hooks into a unit file, `stasis inspect`
//! to print a decoded unit, `stasis snapshot` to print a cache file, and
//! `stasis run` to simulate one host startup against the cache.

#![warn(missing_docs)]

mod inspect;
mod patch;
mod run;
mod snapshot;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use stasis_common::Role;
use stasis_config::{load_config, load_config_file, StasisConfig, CONFIG_FILE};
use tracing_subscriber::EnvFilter;

/// stasis: hook installer and crash-safe component cache.
#[derive(Parser, Debug)]
#[command(name = "stasis", version, about = "Hook installer and component cache")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `stasis.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install hooks into a compiled unit file.
    Patch(PatchArgs),
    /// Print the methods and instructions of a compiled unit file.
    Inspect {
        /// The unit file to decode.
        unit: PathBuf,
    },
    /// Print the contents of a component cache file.
    Snapshot {
        /// The cache file to read.
        file: PathBuf,

        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Simulate one host startup against the component cache.
    Run(RunArgs),
}

/// Arguments for the `stasis patch` subcommand.
#[derive(Parser, Debug)]
pub struct PatchArgs {
    /// The unit file to patch.
    pub unit: PathBuf,

    /// Output path (default: `<unit>.patched`).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Unit name as the host would present it (default: the decoded name).
    #[arg(long)]
    pub name: Option<String>,

    /// Execution role; overrides the configuration.
    #[arg(long)]
    pub role: Option<Role>,
}

/// Arguments for the `stasis run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// TOML file listing the active components as `[[component]]` tables.
    #[arg(long)]
    pub components: PathBuf,

    /// Execution role; overrides the configuration.
    #[arg(long)]
    pub role: Option<Role>,

    /// Stop before the finish trigger, as if startup had crashed.
    #[arg(long)]
    pub crash: bool,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// The loaded (or default) configuration.
    pub config: StasisConfig,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let config = match resolve_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };
    let global = GlobalArgs {
        quiet: cli.quiet,
        config,
    };

    let result = match cli.command {
        Command::Patch(ref args) => patch::run(args, &global),
        Command::Inspect { ref unit } => inspect::run(unit),
        Command::Snapshot { ref file, json } => snapshot::run(file, json),
        Command::Run(ref args) => run::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides the flags.
fn init_logging(quiet: bool, verbose: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the explicit config file, else `./stasis.toml` if present, else defaults.
fn resolve_config(explicit: Option<&Path>) -> Result<StasisConfig, Box<dyn std::error::Error>> {
    resolve_config_in(Path::new("."), explicit)
}

fn resolve_config_in(
    project_dir: &Path,
    explicit: Option<&Path>,
) -> Result<StasisConfig, Box<dyn std::error::Error>> {
    if let Some(path) = explicit {
        let config = load_config_file(path)
            .map_err(|e| format!("cannot load {}: {e}", path.display()))?;
        return Ok(config);
    }
    if !project_dir.join(CONFIG_FILE).exists() {
        return Ok(StasisConfig::default());
    }
    Ok(load_config(project_dir)?)
}
