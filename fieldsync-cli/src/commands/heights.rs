//! `fieldsync update-heights` — push survey heights into null-height records.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use fieldsync_client::LiveStore;
use fieldsync_recon::{pipeline, FileResult};

use super::{dry_run_prefix, print_done, Runtime, Stdout};

/// Arguments for `fieldsync update-heights`.
#[derive(Args, Debug)]
pub struct HeightsArgs {
    /// Directory holding the survey files for one SPK number.
    pub dir: PathBuf,

    /// SPK number all these survey files belong to.
    #[arg(long)]
    pub spk: String,

    /// Show what would be updated without issuing any edit call.
    #[arg(long)]
    pub dry_run: bool,
}

impl HeightsArgs {
    pub fn run(self) -> Result<()> {
        let runtime = Runtime::bootstrap()?;
        let credential = runtime.acquire_credential()?;
        let mut store = LiveStore::new(&runtime.agent, &runtime.settings, &credential);

        let results = pipeline::update_heights(
            &mut store,
            &runtime.settings,
            &self.dir,
            &self.spk,
            self.dry_run,
            &mut Stdout,
        )
        .with_context(|| format!("height update failed for '{}'", self.dir.display()))?;

        print_results(&results);

        let updated = results
            .iter()
            .filter(|r| matches!(r, FileResult::Updated { .. } | FileResult::WouldUpdate { .. }))
            .count();
        let skipped = results.len() - updated;
        let prefix = dry_run_prefix(self.dry_run);
        print_done(&format!(
            "{prefix}'{}' processed ({updated} files applied, {skipped} skipped)",
            self.spk
        ));
        Ok(())
    }
}

fn print_results(results: &[FileResult]) {
    for result in results {
        match result {
            FileResult::Updated { file, records, .. } => {
                println!("  ✎  {file} ({records} records)")
            }
            FileResult::WouldUpdate { file, records, .. } => {
                println!("  ~  {file} ({records} records)")
            }
            FileResult::NoMatches { file, flight_id } => {
                println!("  ·  {file} (no null-height records for flight {flight_id})")
            }
            FileResult::Skipped { file, reason } => println!("  –  {file} ({reason})"),
        }
    }
}
