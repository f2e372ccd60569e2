use std::time::Duration;

use loginguard_common::DelayPolicy;

/// Largest shift that still fits a `u64` multiplier.
const MAX_EXPONENT: u32 = 63;

pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Rounds up to whole seconds, any started second counts.
pub(crate) fn whole_secs(duration: Duration) -> u64 {
    millis(duration).div_ceil(1000)
}

/// Backoff imposed after `attempts` consecutive failures.
/// Formula: base * 2^(attempts - 1), capped at max; no delay for a single failure
pub fn calculate_delay(attempts: u32, policy: &DelayPolicy) -> Duration {
    if attempts <= 1 {
        return Duration::ZERO;
    }

    let base = millis(policy.base_delay);
    let max = millis(policy.max_delay);
    let exponent = (attempts - 1).min(MAX_EXPONENT);

    Duration::from_millis(base.saturating_mul(1 << exponent).min(max))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> DelayPolicy {
        DelayPolicy {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(300_000),
            max_attempts: 10,
            reset_after: Duration::from_millis(3_600_000),
        }
    }

    #[test]
    fn test_whole_secs_rounds_up() {
        assert_eq!(whole_secs(Duration::ZERO), 0);
        assert_eq!(whole_secs(Duration::from_millis(1)), 1);
        assert_eq!(whole_secs(Duration::from_millis(2000)), 2);
        assert_eq!(whole_secs(Duration::from_millis(2001)), 3);
    }

    #[test]
    fn test_no_delay_for_first_failure() {
        let policy = policy();
        assert_eq!(calculate_delay(0, &policy), Duration::ZERO);
        assert_eq!(calculate_delay(1, &policy), Duration::ZERO);
    }

    #[test]
    fn test_delay_doubles_per_failure() {
        let policy = policy();
        // 1000ms * 2^1
        assert_eq!(calculate_delay(2, &policy), Duration::from_millis(2000));
        // 1000ms * 2^2
        assert_eq!(calculate_delay(3, &policy), Duration::from_millis(4000));
        // 1000ms * 2^8
        assert_eq!(calculate_delay(9, &policy), Duration::from_millis(256_000));
    }

    #[test]
    fn test_delay_saturates_at_max() {
        let policy = policy();
        // 1000ms * 2^9 = 512s, capped at 300s
        assert_eq!(calculate_delay(10, &policy), Duration::from_millis(300_000));
        assert_eq!(calculate_delay(64, &policy), Duration::from_millis(300_000));
        assert_eq!(calculate_delay(65, &policy), Duration::from_millis(300_000));
        assert_eq!(calculate_delay(u32::MAX, &policy), Duration::from_millis(300_000));
    }

    #[test]
    fn test_delay_is_monotonic() {
        let policy = policy();
        let mut previous = Duration::ZERO;
        for attempts in 0..200 {
            let delay = calculate_delay(attempts, &policy);
            assert!(delay >= previous, "delay dropped at {attempts}");
            assert!(delay <= policy.max_delay);
            previous = delay;
        }
    }

    #[test]
    fn test_huge_durations_do_not_overflow() {
        let policy = DelayPolicy {
            base_delay: Duration::from_secs(u64::MAX / 2),
            max_delay: Duration::from_secs(u64::MAX),
            ..policy()
        };
        assert_eq!(calculate_delay(5, &policy), Duration::from_millis(u64::MAX));
    }
}
