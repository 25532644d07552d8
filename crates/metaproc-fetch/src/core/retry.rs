use std::time::Duration;

use crate::data::RetryPolicy;

/// Calculate the delay before a retry using exponential backoff.
///
/// The delay formula is: `base * factor^retry_count`
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use metaproc_fetch::retry_delay;
///
/// let base = Duration::from_secs(10);
/// assert_eq!(retry_delay(0, base, 1.5), Duration::from_secs(10));
/// assert_eq!(retry_delay(1, base, 1.5), Duration::from_secs(15));
/// assert_eq!(retry_delay(2, base, 1.5), Duration::from_millis(22_500));
/// ```
pub fn retry_delay(retry_count: u32, base: Duration, factor: f64) -> Duration {
    let exponent = i32::try_from(retry_count).unwrap_or(i32::MAX);
    let multiplier = factor.powi(exponent);
    if !multiplier.is_finite() {
        return Duration::MAX;
    }

    Duration::try_from_secs_f64(base.as_secs_f64() * multiplier).unwrap_or(Duration::MAX)
}

/// The sleep schedule between download rounds.
///
/// Yields `attempts - 1` delays: one after every failed round except the last.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: RetryPolicy,
    taken: u32,
}

impl Backoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, taken: 0 }
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.taken + 1 >= self.policy.attempts {
            return None;
        }
        let delay = retry_delay(self.taken, self.policy.initial_delay, self.policy.backoff_factor);
        self.taken += 1;
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_basic() {
        let base = Duration::from_secs(10);

        assert_eq!(retry_delay(0, base, 1.5), Duration::from_secs(10));
        assert_eq!(retry_delay(1, base, 1.5), Duration::from_secs(15));
        assert_eq!(retry_delay(2, base, 1.5), Duration::from_millis(22_500));
        assert_eq!(retry_delay(3, base, 1.5), Duration::from_millis(33_750));
    }

    #[test]
    fn test_retry_delay_zero_base() {
        let base = Duration::ZERO;

        assert_eq!(retry_delay(0, base, 1.5), Duration::ZERO);
        assert_eq!(retry_delay(10, base, 1.5), Duration::ZERO);
    }

    #[test]
    fn test_retry_delay_is_uncapped() {
        let base = Duration::from_secs(10);

        // 10 * 1.5^20 is a little over 33 000 seconds.
        let delay = retry_delay(20, base, 1.5);
        assert!(delay > Duration::from_secs(33_000));
    }

    #[test]
    fn test_retry_delay_overflow_saturates() {
        let delay = retry_delay(u32::MAX, Duration::from_secs(10), 1.5);
        assert_eq!(delay, Duration::MAX);
    }

    #[test]
    fn test_backoff_schedule() {
        let delays: Vec<_> = Backoff::new(RetryPolicy::with_attempts(4)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(10),
                Duration::from_secs(15),
                Duration::from_millis(22_500),
            ]
        );
    }

    #[test]
    fn test_backoff_single_attempt_never_sleeps() {
        assert_eq!(Backoff::new(RetryPolicy::with_attempts(1)).count(), 0);
        assert_eq!(Backoff::new(RetryPolicy::with_attempts(0)).count(), 0);
    }

    #[test]
    fn test_backoff_growth_factor() {
        let delays: Vec<_> = Backoff::new(RetryPolicy::with_attempts(6)).collect();
        for pair in delays.windows(2) {
            let ratio = pair[1].as_secs_f64() / pair[0].as_secs_f64();
            assert!((ratio - 1.5).abs() < 1e-9);
        }
    }
}
