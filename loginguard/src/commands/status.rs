use anyhow::Result;
use chrono::Utc;

use super::common::{open_guard, print_json};

pub(crate) async fn command(cli: &crate::Cli) -> Result<()> {
    let guard = open_guard(cli).await?;
    let status = guard.status();

    if cli.json {
        return print_json(&status);
    }

    println!("Tracked identifiers: {}", status.tracked_identifiers);
    println!("Locked identifiers:  {}", status.locked_identifiers.len());
    let now = Utc::now();
    for locked in &status.locked_identifiers {
        let remaining = (locked.locked_until - now).to_std().unwrap_or_default();
        println!(
            "  {} ({} attempts, {} left)",
            locked.identifier,
            locked.attempts,
            humantime::format_duration(remaining),
        );
    }

    let credentials = status.credentials;
    println!(
        "Passwords: {} tracked, {} healthy, {} expiring soon, {} expired",
        credentials.total, credentials.healthy, credentials.warning, credentials.expired,
    );
    Ok(())
}
