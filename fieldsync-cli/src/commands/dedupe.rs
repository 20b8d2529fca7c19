//! `fieldsync dedupe` — delete duplicate records, newest per key survives.

use anyhow::{Context, Result};
use clap::Args;

use fieldsync_client::LiveStore;
use fieldsync_recon::pipeline;

use super::{dry_run_prefix, print_done, Runtime, Stdout};

/// Arguments for `fieldsync dedupe`.
#[derive(Args, Debug)]
pub struct DedupeArgs {
    /// Only consider records whose SPK number starts with this prefix.
    #[arg(long)]
    pub spk_prefix: Option<String>,

    /// Show what would be deleted without issuing any edit call.
    #[arg(long)]
    pub dry_run: bool,
}

impl DedupeArgs {
    pub fn run(self) -> Result<()> {
        let runtime = Runtime::bootstrap()?;
        let credential = runtime.acquire_credential()?;
        let mut store = LiveStore::new(&runtime.agent, &runtime.settings, &credential);

        let outcome = pipeline::dedupe(
            &mut store,
            &runtime.settings,
            self.spk_prefix.as_deref(),
            self.dry_run,
            &mut Stdout,
        )
        .context("dedupe workflow failed")?;

        let prefix = dry_run_prefix(outcome.dry_run);
        print_done(&format!(
            "{prefix}dedupe complete ({} fetched, {} kept, {} deleted)",
            outcome.fetched,
            outcome.kept,
            outcome.deleted.len()
        ));
        Ok(())
    }
}
