//! `fieldsync report-nulls` — SPK numbers that still have null heights.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use fieldsync_client::LiveStore;
use fieldsync_recon::pipeline;

use super::{print_done, Runtime};

/// Arguments for `fieldsync report-nulls`.
#[derive(Args, Debug)]
pub struct NullsArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct NullRow {
    #[tabled(rename = "SPK number")]
    spk: String,
}

#[derive(Serialize)]
struct NullReportJson {
    generated_at: String,
    count: usize,
    spk_numbers: Vec<String>,
}

impl NullsArgs {
    pub fn run(self) -> Result<()> {
        let runtime = Runtime::bootstrap()?;
        let credential = runtime.acquire_credential()?;
        let mut store = LiveStore::new(&runtime.agent, &runtime.settings, &credential);

        let spks = pipeline::report_nulls(&mut store, &runtime.settings)
            .context("null-height report failed")?;

        if self.json {
            let report = NullReportJson {
                generated_at: chrono::Utc::now().to_rfc3339(),
                count: spks.len(),
                spk_numbers: spks,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&report)
                    .context("failed to serialize report JSON")?
            );
            return Ok(());
        }

        if spks.is_empty() {
            print_done("no null-height records");
            return Ok(());
        }

        let rows: Vec<NullRow> = spks.iter().map(|spk| NullRow { spk: spk.clone() }).collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        print_done(&format!("{} SPK numbers with null heights", spks.len()));
        Ok(())
    }
}
