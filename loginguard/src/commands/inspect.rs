use anyhow::Result;
use serde_json::json;

use super::common::{open_guard, print_json};

pub(crate) async fn command(cli: &crate::Cli, identifier: &str) -> Result<()> {
    let guard = open_guard(cli).await?;
    let state = guard.attempts().get_delay_state(identifier);
    let decision = guard.attempts().should_delay(identifier);

    if cli.json {
        return print_json(&json!({
            "identifier": identifier,
            "attempts": state.attempts,
            "last_attempt": state.last_attempt,
            "current_delay_ms": u64::try_from(state.current_delay.as_millis()).unwrap_or(u64::MAX),
            "locked_until": state.locked_until,
            "is_locked": state.is_locked,
            "should_delay": decision.should_delay,
            "retry_after_secs": decision.retry_after_secs(),
        }));
    }

    println!("{identifier}");
    println!("  failed attempts: {}", state.attempts);
    if let Some(last_attempt) = state.last_attempt {
        println!("  last attempt:    {last_attempt}");
    }
    println!(
        "  current delay:   {}",
        humantime::format_duration(state.current_delay)
    );
    if let Some(locked_until) = state.locked_until {
        println!("  locked until:    {locked_until}");
    }
    match decision.message {
        Some(message) if decision.should_delay => println!("  {message}"),
        _ => println!("  next attempt is allowed"),
    }
    Ok(())
}
