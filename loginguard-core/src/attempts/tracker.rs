use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use loginguard_common::{AttemptState, DelayPolicy, LoginGuardError};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::backoff::{calculate_delay, whole_secs};
use crate::clock::{add_saturating, to_chrono, until, Clock, SystemClock};
use crate::persistence::{PersistenceWriter, StateStore};
use crate::table::StateTable;

/// Throttling state of one identifier as seen by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelayState {
    pub attempts: u32,
    pub last_attempt: Option<DateTime<Utc>>,
    /// Backoff for the current attempt count
    pub current_delay: Duration,
    pub locked_until: Option<DateTime<Utc>>,
    /// The identifier has reached `max_attempts`
    pub is_locked: bool,
}

impl DelayState {
    fn zero() -> Self {
        Self {
            attempts: 0,
            last_attempt: None,
            current_delay: Duration::ZERO,
            locked_until: None,
            is_locked: false,
        }
    }

    fn from_record(record: &AttemptState, policy: &DelayPolicy) -> Self {
        Self {
            attempts: record.count,
            last_attempt: Some(record.last_attempt),
            current_delay: calculate_delay(record.count, policy),
            locked_until: lock_end(record, policy),
            is_locked: record.count >= policy.max_attempts,
        }
    }
}

/// Whether the next attempt for an identifier has to wait.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelayDecision {
    pub should_delay: bool,
    pub wait: Duration,
    pub message: Option<String>,
}

impl DelayDecision {
    fn allow() -> Self {
        Self {
            should_delay: false,
            wait: Duration::ZERO,
            message: None,
        }
    }

    fn wait(wait: Duration, message: String) -> Self {
        Self {
            should_delay: true,
            wait,
            message: Some(message),
        }
    }

    /// Whole seconds to put in a `Retry-After` header.
    pub fn retry_after_secs(&self) -> u64 {
        whole_secs(self.wait)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LockedIdentifier {
    pub identifier: String,
    pub attempts: u32,
    pub locked_until: DateTime<Utc>,
}

/// Per-identifier failed login counter with backoff and lockout.
pub struct AttemptTracker {
    policy: watch::Sender<DelayPolicy>,
    clock: Arc<dyn Clock>,
    table: Arc<StateTable<AttemptState>>,
    writer: Option<PersistenceWriter>,
}

impl AttemptTracker {
    /// In-memory tracker on the system clock.
    pub fn new(policy: DelayPolicy) -> Result<Self, LoginGuardError> {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    pub fn with_clock(policy: DelayPolicy, clock: Arc<dyn Clock>) -> Result<Self, LoginGuardError> {
        policy.validate()?;
        Ok(Self {
            policy: watch::channel(policy).0,
            clock,
            table: Arc::new(StateTable::new()),
            writer: None,
        })
    }

    /// Tracker backed by `store`.
    ///
    /// Existing records are loaded first. A store that cannot be read is
    /// logged and the tracker starts empty. Must be called within a tokio
    /// runtime, the store is written from a background task.
    pub async fn with_store(
        policy: DelayPolicy,
        clock: Arc<dyn Clock>,
        store: Arc<dyn StateStore<AttemptState>>,
    ) -> Result<Self, LoginGuardError> {
        let mut tracker = Self::with_clock(policy, clock)?;
        match store.load().await {
            Ok(entries) => {
                debug!(entries = entries.len(), "Loaded failed attempt records");
                tracker.table.load(entries);
            }
            Err(error) => {
                warn!(%error, "Could not load failed attempt records, starting empty");
            }
        }
        tracker.writer = Some(PersistenceWriter::spawn(
            "attempts",
            &tracker.table,
            store,
        ));
        Ok(tracker)
    }

    pub fn config(&self) -> DelayPolicy {
        self.policy.borrow().clone()
    }

    /// Swaps the policy. Invalid policies are rejected and the current one stays.
    pub fn set_config(&self, policy: DelayPolicy) -> Result<(), LoginGuardError> {
        policy.validate()?;
        info!(
            max_attempts = policy.max_attempts,
            base_delay = ?policy.base_delay,
            max_delay = ?policy.max_delay,
            reset_after = ?policy.reset_after,
            "Updated delay policy"
        );
        self.policy.send_replace(policy);
        Ok(())
    }

    pub fn subscribe_config(&self) -> watch::Receiver<DelayPolicy> {
        self.policy.subscribe()
    }

    /// Records a failed login and returns the resulting state.
    ///
    /// Failures after a period of inactivity longer than `reset_after` start
    /// counting from scratch. The failure that reaches `max_attempts` locks
    /// the identifier for `max_delay`.
    pub fn record_failed_attempt(&self, identifier: &str) -> DelayState {
        let policy = self.config();
        let now = self.clock.now();

        let record = self.table.update(identifier, |slot| {
            let previous = match slot {
                Some(state) if !is_stale(state, now, &policy) => state.count,
                _ => 0,
            };
            let count = previous.saturating_add(1);
            let record = AttemptState {
                count,
                last_attempt: now,
                locked_until: (count >= policy.max_attempts)
                    .then(|| add_saturating(now, policy.max_delay)),
            };
            *slot = Some(record.clone());
            record
        });

        let state = DelayState::from_record(&record, &policy);
        if let Some(locked_until) = state.locked_until {
            info!(
                identifier,
                attempts = state.attempts,
                %locked_until,
                "Identifier locked after too many failed login attempts"
            );
        } else {
            debug!(
                identifier,
                attempts = state.attempts,
                delay = ?state.current_delay,
                "Recorded failed login attempt"
            );
        }
        state
    }

    /// Current state of `identifier`. Stale records are evicted on access.
    pub fn get_delay_state(&self, identifier: &str) -> DelayState {
        let policy = self.config();
        let now = self.clock.now();
        self.current_state(identifier, now, &policy)
    }

    /// Recommends how long the caller should hold off the next attempt.
    /// Never sleeps; enforcing the wait is up to the caller.
    pub fn should_delay(&self, identifier: &str) -> DelayDecision {
        let policy = self.config();
        let now = self.clock.now();
        let state = self.current_state(identifier, now, &policy);

        if state.is_locked {
            if let Some(locked_until) = state.locked_until.filter(|at| *at > now) {
                let wait = until(now, locked_until);
                return DelayDecision::wait(
                    wait,
                    format!(
                        "Too many failed login attempts. Try again in {}.",
                        describe_wait(wait)
                    ),
                );
            }
        }

        if let Some(last_attempt) = state.last_attempt {
            let elapsed = until(last_attempt, now);
            if elapsed < state.current_delay {
                let wait = state.current_delay - elapsed;
                return DelayDecision::wait(
                    wait,
                    format!("Please wait {} before trying again.", describe_wait(wait)),
                );
            }
        }

        DelayDecision::allow()
    }

    /// Forgets all failures of `identifier`, call after a successful login.
    pub fn reset_attempts(&self, identifier: &str) {
        if self.table.remove(identifier) {
            debug!(identifier, "Cleared failed login attempts");
        }
    }

    /// Evicts every stale record, returning how many were dropped.
    ///
    /// Lookups already evict lazily; this only bounds memory for
    /// identifiers that are never seen again.
    pub fn sweep_stale(&self) -> usize {
        let policy = self.config();
        let now = self.clock.now();
        let removed = self.table.retain(|_, state| !is_stale(state, now, &policy));
        if removed > 0 {
            info!(removed, "Swept stale failed attempt records");
        }
        removed
    }

    pub fn tracked_identifiers(&self) -> usize {
        self.table.len()
    }

    /// Identifiers whose lockout window is still open, soonest unlock first.
    pub fn locked_identifiers(&self) -> Vec<LockedIdentifier> {
        let policy = self.config();
        let now = self.clock.now();
        let mut locked: Vec<_> = self
            .table
            .snapshot()
            .into_iter()
            .filter_map(|(identifier, state)| {
                let locked_until = lock_end(&state, &policy).filter(|at| *at > now)?;
                Some(LockedIdentifier {
                    identifier,
                    attempts: state.count,
                    locked_until,
                })
            })
            .collect();
        locked.sort_by(|a, b| {
            a.locked_until
                .cmp(&b.locked_until)
                .then_with(|| a.identifier.cmp(&b.identifier))
        });
        locked
    }

    /// Waits until every change made so far has reached the store.
    pub async fn flush(&self) -> Result<(), LoginGuardError> {
        match &self.writer {
            Some(writer) => writer.flush(self.table.generation()).await,
            None => Ok(()),
        }
    }

    fn current_state(&self, identifier: &str, now: DateTime<Utc>, policy: &DelayPolicy) -> DelayState {
        let record = self.table.update(identifier, |slot| {
            if slot.as_ref().is_some_and(|state| is_stale(state, now, policy)) {
                debug!(identifier, "Evicted stale failed attempt record");
                *slot = None;
            }
            slot.clone()
        });
        match record {
            Some(record) => DelayState::from_record(&record, policy),
            None => DelayState::zero(),
        }
    }
}

fn is_stale(state: &AttemptState, now: DateTime<Utc>, policy: &DelayPolicy) -> bool {
    now - state.last_attempt > to_chrono(policy.reset_after)
}

fn describe_wait(wait: Duration) -> String {
    humantime::format_duration(Duration::from_secs(whole_secs(wait).max(1))).to_string()
}

/// End of the lockout window under the current policy.
///
/// Records that crossed `max_attempts` only after a policy change carry no
/// stored window, theirs runs from the last failure.
fn lock_end(record: &AttemptState, policy: &DelayPolicy) -> Option<DateTime<Utc>> {
    if record.count < policy.max_attempts {
        return None;
    }
    Some(
        record
            .locked_until
            .unwrap_or_else(|| add_saturating(record.last_attempt, policy.max_delay)),
    )
}
