use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use loginguard_common::{LoginGuardConfig, LoginGuardConfigStore};
use tracing::*;

pub fn load_config(path: &Path) -> Result<LoginGuardConfig> {
    let store: LoginGuardConfigStore = Config::builder()
        .add_source(File::from(path))
        .add_source(
            Environment::with_prefix("LOGINGUARD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Could not load config")?
        .try_deserialize()
        .context("Could not parse config")?;

    let config = LoginGuardConfig {
        store,
        paths_relative_to: path
            .parent()
            .context("Config path has no parent directory")?
            .to_path_buf(),
    };
    config.validate().context("Invalid config")?;

    info!(
        "Using config: {path:?} (max attempts: {}, password lifetime: {} days)",
        config.store.delay.max_attempts, config.store.expiry.expiry_days,
    );
    Ok(config)
}
