mod commands;
mod config;
mod logging;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use logging::init_logging;

/// Failed login throttling and password age tracking.
///
/// Commands work on the configured state files directly. They refuse to
/// run while another process, such as a running service, has the files open.
#[derive(Parser)]
#[command(author, version, about)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, default_value = "/etc/loginguard.yaml", env = "LOGINGUARD_CONFIG")]
    config: PathBuf,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Validate config file
    Check,
    /// Show tracked and locked identifiers and password age statistics
    Status,
    /// Show the throttling state of one identifier
    Inspect { identifier: String },
    /// Clear failed attempts of an identifier
    Unlock { identifier: String },
    /// List users whose passwords are about to expire or have expired
    Expiring,
    /// Record that a user has changed their password
    PasswordChanged { user_id: String },
    /// Forget a user's password age record
    ClearUser { user_id: String },
    /// Evict stale failed attempt records
    Sweep,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Check => crate::commands::check::command(&cli).await,
        Commands::Status => crate::commands::status::command(&cli).await,
        Commands::Inspect { identifier } => {
            crate::commands::inspect::command(&cli, identifier).await
        }
        Commands::Unlock { identifier } => crate::commands::unlock::command(&cli, identifier).await,
        Commands::Expiring => crate::commands::expiring::command(&cli).await,
        Commands::PasswordChanged { user_id } => {
            crate::commands::password_changed::command(&cli, user_id).await
        }
        Commands::ClearUser { user_id } => {
            crate::commands::clear_user::command(&cli, user_id).await
        }
        Commands::Sweep => crate::commands::sweep::command(&cli).await,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_subcommand_arguments() {
        let cli = Cli::parse_from(["loginguard", "--config", "lg.yaml", "unlock", "ip:203.0.113.9"]);
        assert_eq!(cli.config, PathBuf::from("lg.yaml"));
        assert!(matches!(
            cli.command,
            Commands::Unlock { ref identifier } if identifier == "ip:203.0.113.9"
        ));

        let cli = Cli::parse_from(["loginguard", "-c", "lg.yaml", "expiring", "--json"]);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Expiring));
    }
}
