//! Password age tracking with expiry warnings and a bounded number of
//! grace logins after expiry.
//!
//! A user moves `Fresh → Warning → ExpiredWithGrace → Locked` as the
//! password ages and grace logins are spent. Recording a password change
//! returns the user to `Fresh`. A disabled policy, or an excluded admin,
//! always reads as `Fresh`.

mod status;
mod tracker;

pub use status::{
    CredentialStatistics, CredentialStatus, ExpiringUser, ExpiryState, GraceLoginResult,
    LoginDecision,
};
pub use tracker::CredentialAgeTracker;
