//! Subcommand implementations and shared run plumbing.

pub mod dedupe;
pub mod heights;
pub mod login;
pub mod nulls;
pub mod purge;
pub mod rekey;

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;

use fieldsync_client::{TokenManager, UreqTokenEndpoint};
use fieldsync_core::{Credential, Settings};
use fieldsync_recon::ProgressSink;

/// Everything a command needs before its workflow starts: the resolved home,
/// the loaded settings, and one shared blocking agent.
pub(crate) struct Runtime {
    pub home: PathBuf,
    pub settings: Settings,
    pub agent: ureq::Agent,
}

impl Runtime {
    pub fn bootstrap() -> Result<Self> {
        let home = dirs::home_dir().context("could not determine home directory")?;
        let settings = Settings::load_at(&home).context("failed to load settings")?;
        Ok(Self {
            home,
            settings,
            agent: ureq::agent(),
        })
    }

    /// Run the token manager: cache hit or full handshake.
    pub fn acquire_credential(&self) -> Result<Credential> {
        let endpoint = UreqTokenEndpoint::new(self.agent.clone(), &self.settings);
        let manager = TokenManager::new(&self.settings, endpoint, self.home.clone());
        manager.acquire().context("credential handshake failed")
    }

    /// Skip the cache and force a fresh handshake.
    pub fn acquire_fresh_credential(&self) -> Result<Credential> {
        let endpoint = UreqTokenEndpoint::new(self.agent.clone(), &self.settings);
        let manager = TokenManager::new(&self.settings, endpoint, self.home.clone());
        manager
            .acquire_fresh()
            .context("credential handshake failed")
    }
}

/// Sink printing one indented progress line per reported operation.
pub(crate) struct Stdout;

impl ProgressSink for Stdout {
    fn line(&mut self, message: &str) {
        println!("  > {message}");
    }
}

/// `[dry-run] ` prefix for summary lines, or nothing.
pub(crate) fn dry_run_prefix(dry_run: bool) -> &'static str {
    if dry_run {
        "[dry-run] "
    } else {
        ""
    }
}

/// Green check summary line.
pub(crate) fn print_done(message: &str) {
    println!("{} {message}", "✓".green().bold());
}
