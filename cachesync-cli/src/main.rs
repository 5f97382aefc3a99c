//! cachesync: keep a spreadsheet of solved geocaches in step with the
//! search service.
//!
//! # Usage
//!
//! ```text
//! cachesync init
//! cachesync regions [--json]
//! cachesync sync --region <id> [--dry-run] [--store FILE] [--records FILE] [--json]
//! cachesync sync --all [--dry-run] [--store FILE] [--records FILE] [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use commands::{init::InitArgs, regions::RegionsArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "cachesync",
    version,
    about = "Sync solved geocaches into a per-region spreadsheet",
    long_about = None,
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` wins when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the default config to ~/.cachesync/config.yaml.
    Init(InitArgs),

    /// List the configured regions.
    Regions(RegionsArgs),

    /// Reconcile one region (or all of them) against the store.
    Sync(SyncArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::debug!("cachesync v{}", env!("CARGO_PKG_VERSION"));
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Regions(args) => args.run(),
        Commands::Sync(args) => args.run(),
    }
}
