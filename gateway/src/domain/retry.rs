//! Retry timing shared by the allocator and the catalog feed.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Exponential backoff bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Delay before the first retry.
    pub initial: Duration,
    /// Upper bound for any single delay.
    pub max: Duration,
}

impl Backoff {
    /// Un-jittered delay before retry number `attempt` (1-based).
    ///
    /// # Examples
    /// ```
    /// use gateway::domain::Backoff;
    /// use std::time::Duration;
    ///
    /// let backoff = Backoff {
    ///     initial: Duration::from_millis(250),
    ///     max: Duration::from_secs(1),
    /// };
    /// assert_eq!(backoff.base_delay(1), Duration::from_millis(250));
    /// assert_eq!(backoff.base_delay(3), Duration::from_secs(1));
    /// ```
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = 2_u32.saturating_pow(attempt.saturating_sub(1));
        let base_ms = u64::try_from(self.initial.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(base_ms.saturating_mul(u64::from(exponent)).min(max_ms))
    }
}

/// Async sleeping abstraction so tests can observe retry delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend execution for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Tokio-based sleeper.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Retry backoff jitter abstraction.
pub trait BackoffJitter: Send + Sync {
    /// Return a jittered delay from the exponential base delay.
    fn jittered_delay(&self, base: Duration, attempt: u32, now: DateTime<Utc>) -> Duration;
}

/// Default jitter: up to a quarter of the base delay, seeded from the clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttemptJitter;

impl BackoffJitter for AttemptJitter {
    fn jittered_delay(&self, base: Duration, attempt: u32, now: DateTime<Utc>) -> Duration {
        let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        let max_extra = (base_ms / 4).max(1);
        let seed = u64::from(now.timestamp_subsec_nanos()) ^ u64::from(attempt);
        let extra = SmallRng::seed_from_u64(seed).gen_range(0..=max_extra);
        Duration::from_millis(base_ms.saturating_add(extra))
    }
}

/// Jitter that returns the base delay unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl BackoffJitter for NoJitter {
    fn jittered_delay(&self, base: Duration, _attempt: u32, _now: DateTime<Utc>) -> Duration {
        base
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    #[case(1, 25)]
    #[case(2, 50)]
    #[case(3, 100)]
    #[case(6, 500)]
    #[case(40, 500)]
    fn base_delay_doubles_until_capped(#[case] attempt: u32, #[case] expected_ms: u64) {
        let backoff = Backoff {
            initial: Duration::from_millis(25),
            max: Duration::from_millis(500),
        };
        assert_eq!(backoff.base_delay(attempt), Duration::from_millis(expected_ms));
    }

    #[rstest]
    fn attempt_jitter_stays_within_a_quarter() {
        let now = Utc
            .with_ymd_and_hms(2026, 2, 26, 12, 0, 0)
            .single()
            .expect("valid time");
        let base = Duration::from_millis(100);
        for attempt in 1..=8 {
            let delay = AttemptJitter.jittered_delay(base, attempt, now);
            assert!(delay >= base);
            assert!(delay <= Duration::from_millis(125));
        }
    }
}
