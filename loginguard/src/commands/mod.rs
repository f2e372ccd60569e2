pub mod check;
pub mod clear_user;
mod common;
pub mod expiring;
pub mod inspect;
pub mod password_changed;
pub mod status;
pub mod sweep;
pub mod unlock;
