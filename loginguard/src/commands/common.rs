use anyhow::{Context, Result};
use loginguard_core::LoginGuard;
use serde::Serialize;

use crate::config::load_config;

pub(crate) async fn open_guard(cli: &crate::Cli) -> Result<LoginGuard> {
    let config = load_config(&cli.config)?;
    LoginGuard::open(&config)
        .await
        .context("Could not open state stores")
}

/// Waits for pending changes to be written before the process exits.
pub(crate) async fn flush(guard: &LoginGuard) -> Result<()> {
    guard.flush().await.context("Could not save state")
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
