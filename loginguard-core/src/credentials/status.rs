use chrono::{DateTime, Utc};
use loginguard_common::{CredentialState, ExpiryPolicy};
use serde::Serialize;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    Fresh,
    Warning,
    ExpiredWithGrace,
    /// Expired with no grace logins left
    Locked,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExpiryState {
    pub is_expired: bool,
    pub is_warning: bool,
    /// `None` when the password never expires for this user
    pub days_until_expiry: Option<i64>,
    pub grace_logins_remaining: u32,
    pub status: CredentialStatus,
    pub message: Option<String>,
}

impl ExpiryState {
    pub(super) fn exempt(grace_logins: u32) -> Self {
        Self {
            is_expired: false,
            is_warning: false,
            days_until_expiry: None,
            grace_logins_remaining: grace_logins,
            status: CredentialStatus::Fresh,
            message: None,
        }
    }

    pub(super) fn evaluate(
        state: &CredentialState,
        now: DateTime<Utc>,
        policy: &ExpiryPolicy,
    ) -> Self {
        let days_since_change = (now - state.last_password_change)
            .num_milliseconds()
            .div_euclid(MILLIS_PER_DAY);
        let days_until_expiry = i64::from(policy.expiry_days) - days_since_change;
        let is_expired = days_until_expiry <= 0;
        let is_warning = !is_expired && days_until_expiry <= i64::from(policy.warning_days);
        let grace_logins_remaining = state.grace_logins_remaining.min(policy.grace_logins);

        let (status, message) = if is_expired && grace_logins_remaining > 0 {
            (
                CredentialStatus::ExpiredWithGrace,
                Some(format!(
                    "Your password has expired. {} remaining, please change your password now.",
                    plural(i64::from(grace_logins_remaining), "grace login")
                )),
            )
        } else if is_expired {
            (
                CredentialStatus::Locked,
                Some(
                    "Your password has expired and no grace logins remain. Contact an administrator to reset it."
                        .to_owned(),
                ),
            )
        } else if is_warning {
            (
                CredentialStatus::Warning,
                Some(format!(
                    "Your password expires in {}. Please change it soon.",
                    plural(days_until_expiry, "day")
                )),
            )
        } else {
            (CredentialStatus::Fresh, None)
        };

        Self {
            is_expired,
            is_warning,
            days_until_expiry: Some(days_until_expiry),
            grace_logins_remaining,
            status,
            message,
        }
    }
}

fn plural(count: i64, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoginDecision {
    pub allowed: bool,
    pub require_password_change: bool,
    pub message: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GraceLoginResult {
    pub allowed: bool,
    pub remaining: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExpiringUser {
    pub user_id: String,
    pub days_until_expiry: i64,
    pub is_expired: bool,
    pub grace_logins_remaining: u32,
    pub status: CredentialStatus,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CredentialStatistics {
    pub total: usize,
    pub expired: usize,
    pub warning: usize,
    pub healthy: usize,
}
