mod defaults;

use std::path::PathBuf;
use std::time::Duration;

use defaults::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::LoginGuardError;

/// Backoff and lockout policy for failed login attempts.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct DelayPolicy {
    /// Delay unit; the second failure waits `2 * base_delay`
    #[serde(default = "_default_base_delay", with = "humantime_serde")]
    pub base_delay: Duration,

    /// Backoff ceiling, also the length of the lockout window
    #[serde(default = "_default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,

    #[serde(default = "_default_max_attempts")]
    pub max_attempts: u32,

    /// Inactivity period after which an identifier's failures are forgotten
    #[serde(default = "_default_reset_after", with = "humantime_serde")]
    pub reset_after: Duration,
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self {
            base_delay: _default_base_delay(),
            max_delay: _default_max_delay(),
            max_attempts: _default_max_attempts(),
            reset_after: _default_reset_after(),
        }
    }
}

impl DelayPolicy {
    pub fn validate(&self) -> Result<(), LoginGuardError> {
        if self.base_delay.as_millis() == 0 {
            return Err(LoginGuardError::invalid_config(
                "delay.base_delay must be at least 1ms",
            ));
        }
        if self.max_delay.as_millis() == 0 {
            return Err(LoginGuardError::invalid_config(
                "delay.max_delay must be at least 1ms",
            ));
        }
        if self.base_delay > self.max_delay {
            return Err(LoginGuardError::invalid_config(format!(
                "delay.base_delay ({:?}) exceeds delay.max_delay ({:?})",
                self.base_delay, self.max_delay
            )));
        }
        if self.max_attempts == 0 {
            return Err(LoginGuardError::invalid_config(
                "delay.max_attempts must be positive",
            ));
        }
        if self.reset_after.as_millis() == 0 {
            return Err(LoginGuardError::invalid_config(
                "delay.reset_after must be at least 1ms",
            ));
        }
        Ok(())
    }
}

/// Password age policy.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ExpiryPolicy {
    #[serde(default = "_default_expiry_days")]
    pub expiry_days: u32,

    /// Users are warned once this many days or fewer remain
    #[serde(default = "_default_warning_days")]
    pub warning_days: u32,

    #[serde(default = "_default_true")]
    pub enforce_expiry: bool,

    /// Logins allowed after expiry, each forcing a password change prompt
    #[serde(default = "_default_grace_logins")]
    pub grace_logins: u32,

    #[serde(default = "_default_false")]
    pub exclude_admins: bool,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            expiry_days: _default_expiry_days(),
            warning_days: _default_warning_days(),
            enforce_expiry: true,
            grace_logins: _default_grace_logins(),
            exclude_admins: false,
        }
    }
}

impl ExpiryPolicy {
    pub fn validate(&self) -> Result<(), LoginGuardError> {
        if self.expiry_days == 0 {
            return Err(LoginGuardError::invalid_config(
                "expiry.expiry_days must be positive",
            ));
        }
        if self.warning_days >= self.expiry_days {
            return Err(LoginGuardError::invalid_config(format!(
                "expiry.warning_days ({}) must be less than expiry.expiry_days ({})",
                self.warning_days, self.expiry_days
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct StorageConfig {
    /// JSON file holding failed attempt records; in-memory when unset
    #[serde(default)]
    pub attempts: Option<String>,

    /// JSON file holding password age records; in-memory when unset
    #[serde(default)]
    pub credentials: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct LoginGuardConfigStore {
    #[serde(default)]
    pub delay: DelayPolicy,

    #[serde(default)]
    pub expiry: ExpiryPolicy,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl LoginGuardConfigStore {
    pub fn validate(&self) -> Result<(), LoginGuardError> {
        self.delay.validate()?;
        self.expiry.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LoginGuardConfig {
    pub store: LoginGuardConfigStore,
    pub paths_relative_to: PathBuf,
}

impl LoginGuardConfig {
    pub fn attempts_path(&self) -> Option<PathBuf> {
        self.store
            .storage
            .attempts
            .as_ref()
            .map(|p| self.paths_relative_to.join(p))
    }

    pub fn credentials_path(&self) -> Option<PathBuf> {
        self.store
            .storage
            .credentials
            .as_ref()
            .map(|p| self.paths_relative_to.join(p))
    }

    /// Each tracker needs a file of its own.
    pub fn validate_storage(&self) -> Result<(), LoginGuardError> {
        if let (Some(attempts), Some(credentials)) = (self.attempts_path(), self.credentials_path())
        {
            if attempts == credentials {
                return Err(LoginGuardError::invalid_config(format!(
                    "`storage.attempts` and `storage.credentials` both point to {}",
                    attempts.display()
                )));
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), LoginGuardError> {
        self.store.validate()?;
        self.validate_storage()?;

        if self.store.storage.attempts.is_none() {
            warn!("`storage.attempts` is not set - lockouts will not survive a restart.");
        }
        if self.store.storage.credentials.is_none() {
            warn!("`storage.credentials` is not set - password ages will not survive a restart.");
        }
        if self.store.delay.reset_after < self.store.delay.max_delay {
            warn!(
                "`delay.reset_after` is shorter than `delay.max_delay` - lockouts will be forgotten before they expire."
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policies_are_valid() {
        assert!(DelayPolicy::default().validate().is_ok());
        assert!(ExpiryPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_delay_policy_rejects_zero_attempts() {
        let policy = DelayPolicy {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(matches!(
            policy.validate(),
            Err(LoginGuardError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_delay_policy_rejects_zero_durations() {
        for policy in [
            DelayPolicy {
                base_delay: Duration::ZERO,
                ..Default::default()
            },
            DelayPolicy {
                max_delay: Duration::ZERO,
                base_delay: Duration::ZERO,
                ..Default::default()
            },
            DelayPolicy {
                reset_after: Duration::from_micros(10),
                ..Default::default()
            },
        ] {
            assert!(policy.validate().is_err(), "{policy:?} should be rejected");
        }
    }

    #[test]
    fn test_delay_policy_rejects_base_above_max() {
        let policy = DelayPolicy {
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(5),
            ..Default::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_expiry_policy_rejects_zero_days() {
        let policy = ExpiryPolicy {
            expiry_days: 0,
            warning_days: 0,
            ..Default::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_expiry_policy_rejects_warning_covering_whole_lifetime() {
        let policy = ExpiryPolicy {
            expiry_days: 14,
            warning_days: 14,
            ..Default::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_config_store_parses_humantime_durations() {
        let store: LoginGuardConfigStore = serde_json::from_str(
            r#"{
                "delay": { "base_delay": "500ms", "max_delay": "10m", "max_attempts": 5 },
                "expiry": { "expiry_days": 30, "warning_days": 7, "exclude_admins": true },
                "storage": { "attempts": "data/attempts.json" }
            }"#,
        )
        .unwrap();

        assert_eq!(store.delay.base_delay, Duration::from_millis(500));
        assert_eq!(store.delay.max_delay, Duration::from_secs(600));
        assert_eq!(store.delay.max_attempts, 5);
        assert_eq!(store.delay.reset_after, Duration::from_secs(3600));
        assert_eq!(store.expiry.expiry_days, 30);
        assert!(store.expiry.enforce_expiry);
        assert!(store.expiry.exclude_admins);
        assert_eq!(store.expiry.grace_logins, 3);
        assert_eq!(store.storage.attempts.as_deref(), Some("data/attempts.json"));
        assert!(store.storage.credentials.is_none());
        assert!(store.validate().is_ok());
    }

    #[test]
    fn test_storage_paths_are_relative_to_config() {
        let config = LoginGuardConfig {
            store: LoginGuardConfigStore {
                storage: StorageConfig {
                    attempts: Some("data/attempts.json".into()),
                    credentials: None,
                },
                ..Default::default()
            },
            paths_relative_to: PathBuf::from("/etc/loginguard"),
        };
        assert_eq!(
            config.attempts_path(),
            Some(PathBuf::from("/etc/loginguard/data/attempts.json"))
        );
        assert_eq!(config.credentials_path(), None);
    }

    #[test]
    fn test_config_rejects_shared_storage_path() {
        let config = LoginGuardConfig {
            store: LoginGuardConfigStore {
                storage: StorageConfig {
                    attempts: Some("state.json".into()),
                    credentials: Some("/etc/loginguard/state.json".into()),
                },
                ..Default::default()
            },
            paths_relative_to: PathBuf::from("/etc/loginguard"),
        };
        assert!(matches!(
            config.validate(),
            Err(LoginGuardError::InvalidConfig(_))
        ));

        let mut separate = config.clone();
        separate.store.storage.credentials = Some("credentials.json".into());
        assert!(separate.validate().is_ok());
    }
}
