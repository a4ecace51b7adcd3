//! repomirror: mirror GitHub repositories into GitLab.
//!
//! # Usage
//!
//! ```text
//! repomirror sync [--dry-run] [--fail-on-error] [--backup-dir DIR] [--visibility V] [--group G]
//! repomirror list [--json]
//! repomirror logs [--lines N] [--dir DIR]
//! ```
//!
//! Credentials and defaults come from the environment (a `.env` file in the
//! working directory is read first).

mod commands;
mod logging;
mod progress;
mod shutdown;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{list::ListArgs, logs::LogsArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "repomirror",
    version,
    about = "Mirror GitHub repositories into GitLab",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mirror every repository: clone or fetch, ensure the GitLab project,
    /// reconcile its visibility, push.
    Sync(SyncArgs),

    /// List the GitHub repositories a sync would mirror.
    List(ListArgs),

    /// Print the tail of the newest run log.
    Logs(LogsArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::List(args) => args.run().map(|()| ExitCode::SUCCESS),
        Commands::Logs(args) => args.run().map(|()| ExitCode::SUCCESS),
    }
}
