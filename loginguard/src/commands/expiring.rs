use anyhow::Result;

use super::common::{open_guard, print_json};

pub(crate) async fn command(cli: &crate::Cli) -> Result<()> {
    let guard = open_guard(cli).await?;
    let users = guard.credentials().expiring_users();

    if cli.json {
        return print_json(&users);
    }

    if users.is_empty() {
        println!("No passwords are expiring");
        return Ok(());
    }
    for user in users {
        if user.days_until_expiry == 0 {
            println!(
                "{:<32} expired today, {} grace logins left",
                user.user_id, user.grace_logins_remaining,
            );
        } else if user.is_expired {
            println!(
                "{:<32} expired {} days ago, {} grace logins left",
                user.user_id, -user.days_until_expiry, user.grace_logins_remaining,
            );
        } else {
            println!(
                "{:<32} expires in {} days",
                user.user_id, user.days_until_expiry,
            );
        }
    }
    Ok(())
}
