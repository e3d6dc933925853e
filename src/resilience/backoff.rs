//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Jitter-free delay before retrying after attempt `attempt` (0-based):
/// `initial * 2^attempt`, saturating at `Duration::MAX`.
pub fn base_delay(attempt: u32, initial: Duration) -> Duration {
    match 2u32.checked_pow(attempt) {
        Some(factor) => initial.saturating_mul(factor),
        None if initial.is_zero() => Duration::ZERO,
        None => Duration::MAX,
    }
}

/// Calculate exponential backoff delay with jitter.
///
/// The jitter is uniform over `[0, base / 2)`, so the result lies in
/// `[base, 1.5 * base)`.
pub fn calculate_backoff(attempt: u32, initial: Duration) -> Duration {
    let base = base_delay(attempt, initial);
    let half_nanos = u64::try_from((base / 2).as_nanos()).unwrap_or(u64::MAX);
    let jitter = if half_nanos > 0 {
        rand::thread_rng().gen_range(0..half_nanos)
    } else {
        0
    };

    base.saturating_add(Duration::from_nanos(jitter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let initial = Duration::from_millis(100);
        for attempt in 0..6 {
            let base = base_delay(attempt, initial);
            let wait = calculate_backoff(attempt, initial);
            assert!(wait >= base, "attempt {attempt}: {wait:?} < {base:?}");
            assert!(wait < base + base / 2, "attempt {attempt}: {wait:?} too large");
        }
        assert_eq!(base_delay(0, initial), Duration::from_millis(100));
        assert_eq!(base_delay(3, initial), Duration::from_millis(800));
    }

    #[test]
    fn test_base_delay_never_decreases() {
        let initial = Duration::from_millis(10);
        let mut previous = Duration::ZERO;
        for attempt in 0..80 {
            let delay = base_delay(attempt, initial);
            assert!(delay >= previous);
            previous = delay;
        }
        assert_eq!(previous, Duration::MAX);
    }

    #[test]
    fn test_zero_initial_backoff() {
        assert_eq!(calculate_backoff(4, Duration::ZERO), Duration::ZERO);
        assert_eq!(base_delay(40, Duration::ZERO), Duration::ZERO);
    }
}
