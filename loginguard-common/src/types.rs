use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted failed-login record for a single identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptState {
    pub count: u32,
    pub last_attempt: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_until: Option<DateTime<Utc>>,
}

/// Persisted password-age record for a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialState {
    pub last_password_change: DateTime<Utc>,
    pub grace_logins_remaining: u32,
}

impl CredentialState {
    pub fn fresh(now: DateTime<Utc>, grace_logins: u32) -> Self {
        Self {
            last_password_change: now,
            grace_logins_remaining: grace_logins,
        }
    }
}
