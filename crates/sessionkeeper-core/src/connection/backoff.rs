//! Reconnect backoff and circuit breaker cooldown schedule.

use std::time::Duration;

/// Circuit breaker cooldowns, indexed by `min(trips - 1, 3)`.
pub const COOLDOWN_SCHEDULE: [Duration; 4] = [
    Duration::from_secs(60),
    Duration::from_secs(300),
    Duration::from_secs(900),
    Duration::from_secs(1800),
];

/// Delay before reconnect attempt `attempt` (0-based): `min(base * 2^n, max)`.
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
    base.checked_mul(factor).map_or(max, |delay| delay.min(max))
}

/// Cooldown for the given cumulative trip count. Zero trips is treated as one.
pub fn progressive_cooldown(trips: u32) -> Duration {
    let index = (trips.saturating_sub(1) as usize).min(COOLDOWN_SCHEDULE.len() - 1);
    COOLDOWN_SCHEDULE[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_until_capped() {
        let base = Duration::from_secs(5);
        let max = Duration::from_secs(60);
        let delays: Vec<u64> = (0..6).map(|n| backoff_delay(n, base, max).as_secs()).collect();
        assert_eq!(delays, vec![5, 10, 20, 40, 60, 60]);
    }

    #[test]
    fn test_backoff_survives_huge_attempt_counts() {
        let max = Duration::from_secs(60);
        assert_eq!(backoff_delay(64, Duration::from_secs(5), max), max);
        assert_eq!(backoff_delay(u32::MAX, Duration::from_secs(5), max), max);
    }

    #[test]
    fn test_cooldown_is_monotonic_and_capped() {
        let observed: Vec<u64> = (1..=6).map(|t| progressive_cooldown(t).as_millis() as u64).collect();
        assert_eq!(observed, vec![60_000, 300_000, 900_000, 1_800_000, 1_800_000, 1_800_000]);
        assert!(observed.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(progressive_cooldown(0), Duration::from_secs(60));
    }
}
