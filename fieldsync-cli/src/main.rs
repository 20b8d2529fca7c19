//! Fieldsync — feature-store reconciliation CLI.
//!
//! # Usage
//!
//! ```text
//! fieldsync login [--force]
//! fieldsync dedupe [--spk-prefix <P>] [--dry-run]
//! fieldsync rekey --from-prefix <P> --to-prefix <P> [--dry-run]
//! fieldsync update-heights <dir> --spk <SPK> [--dry-run]
//! fieldsync report-nulls [--json]
//! fieldsync purge <SPK> [--dry-run]
//! ```
//!
//! Configuration lives at `~/.fieldsync/config.yaml`; account passwords come
//! from `FIELDSYNC_READ_PASSWORD` and `FIELDSYNC_WRITE_PASSWORD`.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    dedupe::DedupeArgs, heights::HeightsArgs, login::LoginArgs, nulls::NullsArgs,
    purge::PurgeArgs, rekey::RekeyArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "fieldsync",
    version,
    about = "Reconcile survey records against the remote feature store",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Refresh the cached write credential.
    Login(LoginArgs),

    /// Delete duplicate records, keeping the newest per business key.
    Dedupe(DedupeArgs),

    /// Swap the SPK/key pair on every record, deduplicating before and after.
    Rekey(RekeyArgs),

    /// Push survey-file heights into matching null-height records.
    UpdateHeights(HeightsArgs),

    /// List SPK numbers that still have null-height records.
    ReportNulls(NullsArgs),

    /// Delete every record under one SPK number.
    Purge(PurgeArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Login(args) => args.run(),
        Commands::Dedupe(args) => args.run(),
        Commands::Rekey(args) => args.run(),
        Commands::UpdateHeights(args) => args.run(),
        Commands::ReportNulls(args) => args.run(),
        Commands::Purge(args) => args.run(),
    }
}
