//! `fieldsync rekey` — swap the SPK/key pair with dedup on both sides.

use anyhow::{Context, Result};
use clap::Args;

use fieldsync_client::LiveStore;
use fieldsync_recon::pipeline;

use super::{dry_run_prefix, print_done, Runtime, Stdout};

/// Arguments for `fieldsync rekey`.
#[derive(Args, Debug)]
pub struct RekeyArgs {
    /// SPK prefix the records carry before the swap.
    #[arg(long)]
    pub from_prefix: String,

    /// SPK prefix the records carry after the swap (for the second pass).
    #[arg(long)]
    pub to_prefix: String,

    /// Show what would change without issuing any edit call.
    #[arg(long)]
    pub dry_run: bool,
}

impl RekeyArgs {
    pub fn run(self) -> Result<()> {
        let runtime = Runtime::bootstrap()?;
        let credential = runtime.acquire_credential()?;
        let mut store = LiveStore::new(&runtime.agent, &runtime.settings, &credential);

        let outcome = pipeline::rekey(
            &mut store,
            &runtime.settings,
            &self.from_prefix,
            &self.to_prefix,
            self.dry_run,
            &mut Stdout,
        )
        .context("rekey workflow failed")?;

        let prefix = dry_run_prefix(outcome.dry_run);
        print_done(&format!(
            "{prefix}rekey complete ({} duplicates removed, {} re-keyed, {} post-swap duplicates removed)",
            outcome.first_pass_deleted.len(),
            outcome.swapped,
            outcome.second_pass_deleted.len()
        ));
        Ok(())
    }
}
