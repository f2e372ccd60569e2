use anyhow::Result;
use tracing::*;

use super::common::{flush, open_guard};

pub(crate) async fn command(cli: &crate::Cli) -> Result<()> {
    let guard = open_guard(cli).await?;
    let evicted = guard.attempts().sweep_stale();
    flush(&guard).await?;
    if evicted == 0 {
        info!("No stale records found");
    }
    Ok(())
}
