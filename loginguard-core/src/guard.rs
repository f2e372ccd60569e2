use std::sync::Arc;

use loginguard_common::{
    AttemptState, CredentialState, LoginGuardConfig, LoginGuardConfigStore, LoginGuardError,
};
use serde::Serialize;
use tracing::info;

use crate::attempts::{AttemptTracker, LockedIdentifier};
use crate::clock::{Clock, SystemClock};
use crate::credentials::{CredentialAgeTracker, CredentialStatistics};
use crate::persistence::{JsonFileStore, StoreLock};

/// Both trackers built from a single configuration.
///
/// File-backed stores are locked for as long as the guard lives, a second
/// guard on the same files fails to open with
/// [`LoginGuardError::StoreLocked`].
pub struct LoginGuard {
    attempts: AttemptTracker,
    credentials: CredentialAgeTracker,
    _locks: Vec<StoreLock>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoginGuardStatus {
    pub tracked_identifiers: usize,
    pub locked_identifiers: Vec<LockedIdentifier>,
    pub credentials: CredentialStatistics,
}

impl LoginGuard {
    pub async fn open(config: &LoginGuardConfig) -> Result<Self, LoginGuardError> {
        Self::open_with_clock(config, Arc::new(SystemClock)).await
    }

    /// Builds both trackers, file-backed where a storage path is configured.
    pub async fn open_with_clock(
        config: &LoginGuardConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LoginGuardError> {
        config.store.validate()?;
        config.validate_storage()?;
        let delay = config.store.delay.clone();
        let expiry = config.store.expiry.clone();

        let locks = [config.attempts_path(), config.credentials_path()]
            .iter()
            .flatten()
            .map(|path| StoreLock::acquire(path))
            .collect::<Result<Vec<_>, _>>()?;

        let attempts = match config.attempts_path() {
            Some(path) => {
                info!(?path, "Using failed attempt store");
                let store = Arc::new(JsonFileStore::<AttemptState>::new(path));
                AttemptTracker::with_store(delay, clock.clone(), store).await?
            }
            None => AttemptTracker::with_clock(delay, clock.clone())?,
        };

        let credentials = match config.credentials_path() {
            Some(path) => {
                info!(?path, "Using credential store");
                let store = Arc::new(JsonFileStore::<CredentialState>::new(path));
                CredentialAgeTracker::with_store(expiry, clock, store).await?
            }
            None => CredentialAgeTracker::with_clock(expiry, clock)?,
        };

        Ok(Self {
            attempts,
            credentials,
            _locks: locks,
        })
    }

    pub fn attempts(&self) -> &AttemptTracker {
        &self.attempts
    }

    pub fn credentials(&self) -> &CredentialAgeTracker {
        &self.credentials
    }

    /// Applies new policies. Both are validated before either is swapped.
    pub fn reload(&self, store: &LoginGuardConfigStore) -> Result<(), LoginGuardError> {
        store.validate()?;
        self.attempts.set_config(store.delay.clone())?;
        self.credentials.set_config(store.expiry.clone())?;
        Ok(())
    }

    pub fn status(&self) -> LoginGuardStatus {
        LoginGuardStatus {
            tracked_identifiers: self.attempts.tracked_identifiers(),
            locked_identifiers: self.attempts.locked_identifiers(),
            credentials: self.credentials.statistics(),
        }
    }

    pub async fn flush(&self) -> Result<(), LoginGuardError> {
        self.attempts.flush().await?;
        self.credentials.flush().await
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use chrono::Utc;
    use loginguard_common::{DelayPolicy, ExpiryPolicy, StorageConfig};

    use super::*;
    use crate::clock::ManualClock;

    fn config(dir: &Path) -> LoginGuardConfig {
        LoginGuardConfig {
            store: LoginGuardConfigStore {
                delay: DelayPolicy {
                    max_attempts: 3,
                    ..Default::default()
                },
                expiry: ExpiryPolicy::default(),
                storage: StorageConfig {
                    attempts: Some("state/attempts.json".into()),
                    credentials: Some("state/credentials.json".into()),
                },
            },
            paths_relative_to: dir.to_path_buf(),
        }
    }

    #[tokio::test]
    async fn test_state_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let clock = Arc::new(ManualClock::new(Utc::now()));

        let guard = LoginGuard::open_with_clock(&config, clock.clone()).await.unwrap();
        for _ in 0..3 {
            guard.attempts().record_failed_attempt("user:alice");
        }
        guard.credentials().record_password_change("alice");
        guard.flush().await.unwrap();
        drop(guard);

        assert!(dir.path().join("state/attempts.json").exists());
        assert!(dir.path().join("state/credentials.json").exists());

        let guard = LoginGuard::open_with_clock(&config, clock).await.unwrap();
        let status = guard.status();
        assert_eq!(status.tracked_identifiers, 1);
        assert_eq!(status.locked_identifiers.len(), 1);
        assert_eq!(status.locked_identifiers[0].identifier, "user:alice");
        assert_eq!(status.credentials.total, 1);
        assert_eq!(status.credentials.healthy, 1);
    }

    #[tokio::test]
    async fn test_in_memory_without_storage_paths() {
        let guard = LoginGuard::open(&LoginGuardConfig {
            store: LoginGuardConfigStore::default(),
            paths_relative_to: ".".into(),
        })
        .await
        .unwrap();
        guard.attempts().record_failed_attempt("ip:198.51.100.4");
        guard.flush().await.unwrap();
        assert_eq!(guard.status().tracked_identifiers, 1);
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.store.expiry.expiry_days = 0;
        config.store.expiry.warning_days = 0;
        assert!(matches!(
            LoginGuard::open(&config).await,
            Err(LoginGuardError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_store_in_use_cannot_be_opened_twice() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let service = LoginGuard::open(&config).await.unwrap();
        for _ in 0..3 {
            service.attempts().record_failed_attempt("user:alice");
        }
        service.flush().await.unwrap();

        assert!(matches!(
            LoginGuard::open(&config).await,
            Err(LoginGuardError::StoreLocked(path))
                if path == dir.path().join("state/attempts.json")
        ));

        drop(service);
        let operator = LoginGuard::open(&config).await.unwrap();
        operator.attempts().reset_attempts("user:alice");
        operator.flush().await.unwrap();
        drop(operator);

        let service = LoginGuard::open(&config).await.unwrap();
        assert_eq!(service.attempts().get_delay_state("user:alice").attempts, 0);
    }

    #[tokio::test]
    async fn test_open_rejects_shared_storage_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.store.storage.credentials = config.store.storage.attempts.clone();
        assert!(matches!(
            LoginGuard::open(&config).await,
            Err(LoginGuardError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_reload_is_all_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let guard = LoginGuard::open(&config).await.unwrap();

        let mut invalid = config.store.clone();
        invalid.delay.base_delay = Duration::from_secs(2);
        invalid.expiry.warning_days = invalid.expiry.expiry_days;
        assert!(guard.reload(&invalid).is_err());
        assert_eq!(guard.attempts().config(), config.store.delay);

        let mut valid = config.store.clone();
        valid.delay.max_attempts = 7;
        valid.expiry.grace_logins = 1;
        guard.reload(&valid).unwrap();
        assert_eq!(guard.attempts().config().max_attempts, 7);
        assert_eq!(guard.credentials().config().grace_logins, 1);
    }
}
