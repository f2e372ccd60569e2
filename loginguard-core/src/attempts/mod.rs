//! Failed login tracking with exponential backoff and temporary lockout.
//!
//! The caller asks [`AttemptTracker::should_delay`] before verifying
//! credentials, reports failures with [`AttemptTracker::record_failed_attempt`]
//! and clears the identifier with [`AttemptTracker::reset_attempts`] after a
//! successful login. Identifiers are opaque: callers that throttle by both
//! username and address should namespace their keys (`user:alice`,
//! `ip:203.0.113.7`) so the two never collide.

mod backoff;
mod tracker;

pub use backoff::calculate_delay;
pub use tracker::{AttemptTracker, DelayDecision, DelayState, LockedIdentifier};
