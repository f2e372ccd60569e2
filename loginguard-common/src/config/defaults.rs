use std::time::Duration;

pub(crate) const fn _default_true() -> bool {
    true
}

pub(crate) const fn _default_false() -> bool {
    false
}

#[inline]
pub(crate) fn _default_base_delay() -> Duration {
    Duration::from_secs(1)
}

#[inline]
pub(crate) fn _default_max_delay() -> Duration {
    Duration::from_secs(60 * 5)
}

pub(crate) const fn _default_max_attempts() -> u32 {
    10
}

#[inline]
pub(crate) fn _default_reset_after() -> Duration {
    Duration::from_secs(60 * 60)
}

pub(crate) const fn _default_expiry_days() -> u32 {
    90
}

pub(crate) const fn _default_warning_days() -> u32 {
    14
}

pub(crate) const fn _default_grace_logins() -> u32 {
    3
}
