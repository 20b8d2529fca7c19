//! `fieldsync purge <SPK>` — delete every record under one SPK number.

use anyhow::{Context, Result};
use clap::Args;

use fieldsync_client::LiveStore;
use fieldsync_recon::pipeline;

use super::{dry_run_prefix, print_done, Runtime, Stdout};

/// Arguments for `fieldsync purge`.
#[derive(Args, Debug)]
pub struct PurgeArgs {
    /// SPK number whose records are removed.
    pub spk: String,

    /// Show what would be deleted without issuing any edit call.
    #[arg(long)]
    pub dry_run: bool,
}

impl PurgeArgs {
    pub fn run(self) -> Result<()> {
        let runtime = Runtime::bootstrap()?;
        let credential = runtime.acquire_credential()?;
        let mut store = LiveStore::new(&runtime.agent, &runtime.settings, &credential);

        let outcome = pipeline::purge(
            &mut store,
            &runtime.settings,
            &self.spk,
            self.dry_run,
            &mut Stdout,
        )
        .with_context(|| format!("purge failed for '{}'", self.spk))?;

        let prefix = dry_run_prefix(outcome.dry_run);
        print_done(&format!(
            "{prefix}'{}' purged ({} records deleted)",
            self.spk,
            outcome.deleted.len()
        ));
        Ok(())
    }
}
