//! Binary entrypoint for the quickpaste daemon.
use std::{io, path::PathBuf, process};

use clap::{Parser, Subcommand};
use logging as logshared;
use quickpaste_config::{ConfigStore, DEFAULT_CONFIG_FILE};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*};

/// Stdin control console.
mod console;
/// Engine, router and console on the tokio runtime.
mod daemon;
mod error;
/// Main-thread hotkey host.
mod host;

use error::{Error, Result};

#[derive(Parser, Debug)]
#[command(
    name = "quickpaste",
    about = "Global hotkeys that paste text, press keys and paste images",
    version
)]
/// Command-line interface for the `quickpaste` binary.
struct Cli {
    /// Optional subcommand; defaults to `run`.
    #[command(subcommand)]
    command: Option<Command>,

    /// Logging controls
    #[command(flatten)]
    log: logshared::LogArgs,

    /// Path to the hotkey table
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

#[derive(Subcommand, Debug)]
/// Top-level CLI subcommands.
enum Command {
    /// Arm the hotkeys and serve the console (the default).
    Run,
    /// Load and validate the configuration then exit.
    Check {
        /// Path to configuration file to check (defaults to --config)
        path: Option<PathBuf>,

        /// Dump the parsed table as JSON to stdout
        #[arg(long)]
        dump: bool,
    },
}

/// Validate a config file, printing `OK` or the normalized table.
fn check(path: PathBuf, dump: bool) -> Result<()> {
    if !path.exists() {
        return Err(quickpaste_config::Error::Read {
            path,
            message: "file not found".into(),
        }
        .into());
    }
    let table = ConfigStore::new(path).try_load()?;
    if dump {
        match serde_json::to_string_pretty(&table) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Failed to serialize table: {e}");
                process::exit(1);
            }
        }
    } else {
        println!("OK ({} bindings)", table.len());
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let env_filter = logshared::env_filter_from_spec(&cli.log.spec());
    // Logs go to stderr so console replies on stdout stay clean.
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().without_time().with_writer(io::stderr))
        .try_init()
        .ok();

    match cli.command.unwrap_or(Command::Run) {
        Command::Check { path, dump } => {
            if let Err(e) = check(path.unwrap_or(cli.config), dump) {
                eprintln!("{e}");
                process::exit(1);
            }
        }
        Command::Run => {
            if let Err(e) = host::run(cli.config) {
                error!(error = %e, "startup_failed");
                eprintln!("{e}");
                process::exit(1);
            }
        }
    }
}
