use std::sync::Arc;

use loginguard_common::{CredentialState, ExpiryPolicy, LoginGuardError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::status::{
    CredentialStatistics, CredentialStatus, ExpiringUser, ExpiryState, GraceLoginResult,
    LoginDecision,
};
use crate::clock::{Clock, SystemClock};
use crate::persistence::{PersistenceWriter, StateStore};
use crate::table::StateTable;

/// Per-user password age and grace login ledger.
pub struct CredentialAgeTracker {
    policy: watch::Sender<ExpiryPolicy>,
    clock: Arc<dyn Clock>,
    table: Arc<StateTable<CredentialState>>,
    writer: Option<PersistenceWriter>,
}

impl CredentialAgeTracker {
    pub fn new(policy: ExpiryPolicy) -> Result<Self, LoginGuardError> {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    pub fn with_clock(policy: ExpiryPolicy, clock: Arc<dyn Clock>) -> Result<Self, LoginGuardError> {
        policy.validate()?;
        Ok(Self {
            policy: watch::channel(policy).0,
            clock,
            table: Arc::new(StateTable::new()),
            writer: None,
        })
    }

    /// Tracker backed by `store`, see [`crate::AttemptTracker::with_store`].
    pub async fn with_store(
        policy: ExpiryPolicy,
        clock: Arc<dyn Clock>,
        store: Arc<dyn StateStore<CredentialState>>,
    ) -> Result<Self, LoginGuardError> {
        let mut tracker = Self::with_clock(policy, clock)?;
        match store.load().await {
            Ok(entries) => {
                debug!(entries = entries.len(), "Loaded credential records");
                tracker.table.load(entries);
            }
            Err(error) => {
                warn!(%error, "Could not load credential records, starting empty");
            }
        }
        tracker.writer = Some(PersistenceWriter::spawn(
            "credentials",
            &tracker.table,
            store,
        ));
        Ok(tracker)
    }

    pub fn config(&self) -> ExpiryPolicy {
        self.policy.borrow().clone()
    }

    pub fn set_config(&self, policy: ExpiryPolicy) -> Result<(), LoginGuardError> {
        policy.validate()?;
        info!(
            expiry_days = policy.expiry_days,
            warning_days = policy.warning_days,
            enforce_expiry = policy.enforce_expiry,
            grace_logins = policy.grace_logins,
            exclude_admins = policy.exclude_admins,
            "Updated expiry policy"
        );
        self.policy.send_replace(policy);
        Ok(())
    }

    pub fn subscribe_config(&self) -> watch::Receiver<ExpiryPolicy> {
        self.policy.subscribe()
    }

    /// Marks the password as changed now and restores the full grace allowance.
    pub fn record_password_change(&self, user_id: &str) {
        let policy = self.config();
        let now = self.clock.now();
        self.table.update(user_id, |slot| {
            *slot = Some(CredentialState::fresh(now, policy.grace_logins));
        });
        info!(user_id, "Recorded password change");
    }

    /// Password age of `user_id`.
    ///
    /// Users seen for the first time start their password lifetime now.
    pub fn check_expiry(&self, user_id: &str, is_admin: bool) -> ExpiryState {
        let policy = self.config();
        if is_exempt(&policy, is_admin) {
            return ExpiryState::exempt(policy.grace_logins);
        }

        let now = self.clock.now();
        let state = self.table.update(user_id, |slot| {
            if slot.is_none() {
                debug!(user_id, "Started tracking password age");
            }
            let state = slot.get_or_insert_with(|| CredentialState::fresh(now, policy.grace_logins));
            state.grace_logins_remaining = state.grace_logins_remaining.min(policy.grace_logins);
            state.clone()
        });
        ExpiryState::evaluate(&state, now, &policy)
    }

    /// Whether `user_id` may start a session, and whether it must change its password first.
    ///
    /// Does not spend a grace login; call [`Self::use_grace_login`] once the
    /// session is actually granted.
    pub fn can_login(&self, user_id: &str, is_admin: bool) -> LoginDecision {
        let expiry = self.check_expiry(user_id, is_admin);
        match expiry.status {
            CredentialStatus::Fresh | CredentialStatus::Warning => LoginDecision {
                allowed: true,
                require_password_change: false,
                message: expiry.message,
            },
            CredentialStatus::ExpiredWithGrace => LoginDecision {
                allowed: true,
                require_password_change: true,
                message: expiry.message,
            },
            CredentialStatus::Locked => {
                info!(user_id, "Denied login with expired password");
                LoginDecision {
                    allowed: false,
                    require_password_change: true,
                    message: expiry.message,
                }
            }
        }
    }

    /// Spends one grace login. Denied once none remain.
    pub fn use_grace_login(&self, user_id: &str) -> GraceLoginResult {
        let policy = self.config();
        let now = self.clock.now();
        let result = self.table.update(user_id, |slot| {
            let state = slot.get_or_insert_with(|| CredentialState::fresh(now, policy.grace_logins));
            let remaining = state.grace_logins_remaining.min(policy.grace_logins);
            if remaining == 0 {
                state.grace_logins_remaining = 0;
                return GraceLoginResult {
                    allowed: false,
                    remaining: 0,
                };
            }
            state.grace_logins_remaining = remaining - 1;
            GraceLoginResult {
                allowed: true,
                remaining: remaining - 1,
            }
        });

        if result.allowed {
            info!(user_id, remaining = result.remaining, "Used grace login");
        } else {
            info!(user_id, "No grace logins remaining");
        }
        result
    }

    /// Users in the warning window or past expiry, most urgent first.
    ///
    /// Admin exclusion cannot be applied here since records carry no role.
    pub fn expiring_users(&self) -> Vec<ExpiringUser> {
        let policy = self.config();
        if !policy.enforce_expiry {
            return vec![];
        }
        let now = self.clock.now();

        let mut users: Vec<_> = self
            .table
            .snapshot()
            .into_iter()
            .filter_map(|(user_id, state)| {
                let expiry = ExpiryState::evaluate(&state, now, &policy);
                if !expiry.is_expired && !expiry.is_warning {
                    return None;
                }
                Some(ExpiringUser {
                    user_id,
                    days_until_expiry: expiry.days_until_expiry?,
                    is_expired: expiry.is_expired,
                    grace_logins_remaining: expiry.grace_logins_remaining,
                    status: expiry.status,
                })
            })
            .collect();
        users.sort_by(|a, b| {
            a.days_until_expiry
                .cmp(&b.days_until_expiry)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        users
    }

    pub fn statistics(&self) -> CredentialStatistics {
        let policy = self.config();
        let snapshot = self.table.snapshot();
        let mut stats = CredentialStatistics {
            total: snapshot.len(),
            ..Default::default()
        };
        if !policy.enforce_expiry {
            stats.healthy = stats.total;
            return stats;
        }

        let now = self.clock.now();
        for state in snapshot.values() {
            let expiry = ExpiryState::evaluate(state, now, &policy);
            if expiry.is_expired {
                stats.expired += 1;
            } else if expiry.is_warning {
                stats.warning += 1;
            } else {
                stats.healthy += 1;
            }
        }
        stats
    }

    pub fn clear_user(&self, user_id: &str) {
        if self.table.remove(user_id) {
            info!(user_id, "Cleared credential record");
        }
    }

    pub fn tracked_users(&self) -> usize {
        self.table.len()
    }

    /// Waits until every change made so far has reached the store.
    pub async fn flush(&self) -> Result<(), LoginGuardError> {
        match &self.writer {
            Some(writer) => writer.flush(self.table.generation()).await,
            None => Ok(()),
        }
    }
}

fn is_exempt(policy: &ExpiryPolicy, is_admin: bool) -> bool {
    !policy.enforce_expiry || (policy.exclude_admins && is_admin)
}
