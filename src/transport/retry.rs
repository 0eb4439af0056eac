//! Exponential backoff with decorrelated jitter (§4.9).

use std::time::Duration;

use rand::Rng;

const BASE_MS: u64 = 500;
const CAP_MS: u64 = 30_000;

/// Policy governing how many attempts a retriable classification gets.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u8,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u8) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, 10),
        }
    }
}

/// `delay_n = min(cap, random_between(base, delay_{n-1} * 3))`. `previous`
/// is the delay from the prior attempt (or `base` for the first retry).
pub fn next_delay(previous: Duration, rng: &mut impl Rng) -> Duration {
    let upper = (previous.as_millis() as u64).saturating_mul(3).max(BASE_MS);
    let sampled = if BASE_MS >= upper {
        BASE_MS
    } else {
        rng.gen_range(BASE_MS..=upper)
    };
    Duration::from_millis(sampled.min(CAP_MS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn delay_never_exceeds_cap() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut delay = Duration::from_millis(BASE_MS);
        for _ in 0..50 {
            delay = next_delay(delay, &mut rng);
            assert!(delay <= Duration::from_millis(CAP_MS));
        }
    }

    #[test]
    fn delay_never_below_base() {
        let mut rng = StdRng::seed_from_u64(2);
        let delay = next_delay(Duration::from_millis(0), &mut rng);
        assert!(delay >= Duration::from_millis(BASE_MS));
    }

    #[test]
    fn default_policy_allows_three_attempts() {
        assert_eq!(RetryPolicy::default().max_attempts, 3);
    }

    #[test]
    fn policy_clamps_out_of_range_attempts() {
        assert_eq!(RetryPolicy::new(0).max_attempts, 1);
        assert_eq!(RetryPolicy::new(50).max_attempts, 10);
    }
}
