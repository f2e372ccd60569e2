pub mod attempts;
mod clock;
pub mod credentials;
mod guard;
pub mod persistence;
mod table;

pub use attempts::{calculate_delay, AttemptTracker, DelayDecision, DelayState, LockedIdentifier};
pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::{
    CredentialAgeTracker, CredentialStatistics, CredentialStatus, ExpiringUser, ExpiryState,
    GraceLoginResult, LoginDecision,
};
pub use guard::{LoginGuard, LoginGuardStatus};
