//! fetchkeep — keep local copies of remote files, without losing local edits.
//!
//! # Usage
//!
//! ```text
//! fetchkeep [sync] [--dry-run] [--json]
//! fetchkeep status [--json]
//! fetchkeep track <name> <url>
//! fetchkeep untrack <name>
//! ```
//!
//! Global options (`--dir`, `--manifest`, `--state`, `--cache-dir`,
//! `--algorithm`, `--jobs`, `--timeout`, `-v`) apply to every command.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    status::StatusArgs, sync::SyncArgs, track::TrackArgs, untrack::UntrackArgs, Settings,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "fetchkeep",
    version,
    about = "Keep local copies of remote files in sync without clobbering local edits",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch every tracked file and update the ones that are safe to replace.
    Sync(SyncArgs),

    /// Show which working copies were edited since their last sync (no network).
    Status(StatusArgs),

    /// Start tracking a file, or change the URL of a tracked one.
    Track(TrackArgs),

    /// Stop tracking a file; local and cached copies are left on disk.
    Untrack(UntrackArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.settings.verbose);

    match cli.command.unwrap_or_else(|| Commands::Sync(SyncArgs::default())) {
        Commands::Sync(args) => args.run(&cli.settings),
        Commands::Status(args) => args.run(&cli.settings),
        Commands::Track(args) => args.run(&cli.settings),
        Commands::Untrack(args) => args.run(&cli.settings),
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
