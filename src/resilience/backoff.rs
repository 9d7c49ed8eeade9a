//! Exponential backoff with jitter for the retry loop.

use rand::Rng;
use std::time::Duration;

/// Delay before retry attempt `attempt` (1-based): `base_ms` doubled per
/// prior attempt, capped at `max_ms`, plus up to 10% jitter so retries from
/// concurrent requests spread out.
///
/// Attempt 0 is the initial request and gets no delay.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    // Doublings beyond 63 would overflow the shift; the cap has long since
    // taken over by then anyway.
    let doublings = (attempt - 1).min(63);
    let delay = base_ms.saturating_mul(1u64 << doublings).min(max_ms);

    let jitter = match delay / 10 {
        0 => 0,
        range => rand::thread_rng().gen_range(0..range),
    };

    Duration::from_millis(delay.saturating_add(jitter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_delay_before_first_attempt() {
        assert_eq!(calculate_backoff(0, 100, 2000), Duration::from_millis(0));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let b1 = calculate_backoff(1, 100, 2000);
        assert!(b1.as_millis() >= 100 && b1.as_millis() < 200);

        let b2 = calculate_backoff(2, 100, 2000);
        assert!(b2.as_millis() >= 200 && b2.as_millis() < 400);

        let capped = calculate_backoff(10, 100, 1000);
        assert!(capped.as_millis() >= 1000 && capped.as_millis() < 1200);
    }
}
