//! `fieldsync login` — refresh the cached write credential.

use anyhow::Result;
use clap::Args;

use super::{print_done, Runtime};

/// Arguments for `fieldsync login`.
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Discard any cached credential and run the full handshake.
    #[arg(long)]
    pub force: bool,
}

impl LoginArgs {
    pub fn run(self) -> Result<()> {
        let runtime = Runtime::bootstrap()?;
        let credential = if self.force {
            runtime.acquire_fresh_credential()?
        } else {
            runtime.acquire_credential()?
        };

        let expires = credential
            .expires_at()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| credential.expires_at_ms.to_string());
        print_done(&format!("credential valid until {expires}"));
        Ok(())
    }
}
