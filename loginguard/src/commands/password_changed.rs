use anyhow::Result;

use super::common::{flush, open_guard};

pub(crate) async fn command(cli: &crate::Cli, user_id: &str) -> Result<()> {
    let guard = open_guard(cli).await?;
    guard.credentials().record_password_change(user_id);
    flush(&guard).await
}
