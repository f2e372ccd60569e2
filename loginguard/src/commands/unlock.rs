use anyhow::Result;
use tracing::*;

use super::common::{flush, open_guard};

pub(crate) async fn command(cli: &crate::Cli, identifier: &str) -> Result<()> {
    let guard = open_guard(cli).await?;
    let attempts = guard.attempts().get_delay_state(identifier).attempts;
    guard.attempts().reset_attempts(identifier);
    flush(&guard).await?;

    if attempts == 0 {
        info!(identifier, "No failed attempts recorded");
    } else {
        info!(identifier, attempts, "Unlocked");
    }
    Ok(())
}
