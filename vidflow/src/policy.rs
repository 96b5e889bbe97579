//! Per-stage retry, timeout and deadline policy.
//!
//! Delays grow per attempt according to a configurable backoff curve with
//! optional jitter. Which failures are retried, and how often, depends on
//! the error's classification.

use crate::errors::StageError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff strategy for retry delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = base * 2^attempt
    #[default]
    Exponential,
    /// delay = base * (attempt + 1)
    Linear,
    /// delay = base (constant)
    Constant,
}

/// Jitter strategy to prevent thundering herd.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter.
    None,
    /// Random from 0 to delay.
    #[default]
    Full,
    /// Half fixed, half random.
    Equal,
}

/// Retry and timeout configuration applied to every node attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts for retryable failures (including the first).
    pub max_attempts: usize,
    /// Base delay between retries in milliseconds.
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Backoff strategy.
    pub backoff: BackoffStrategy,
    /// Jitter strategy.
    pub jitter: JitterStrategy,
    /// Wall-clock bound for one attempt; exceeding it is a retryable
    /// timeout, never success with stale data.
    pub attempt_timeout: Duration,
    /// Overall deadline for the whole execution. When exceeded, pending
    /// and in-flight nodes are cancelled and reported failed-by-timeout.
    pub execution_deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            backoff: BackoffStrategy::Exponential,
            jitter: JitterStrategy::Full,
            attempt_timeout: Duration::from_secs(30),
            execution_deadline: None,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff = strategy;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter = strategy;
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Sets the overall execution deadline.
    #[must_use]
    pub fn with_execution_deadline(mut self, deadline: Duration) -> Self {
        self.execution_deadline = Some(deadline);
        self
    }

    /// How many attempts this error is allowed in total.
    ///
    /// Fatal errors get exactly one. Malformed responses are retried once,
    /// since a second call may get a well-formed response. Transient
    /// failures and timeouts use the configured cap.
    #[must_use]
    pub fn attempt_cap(&self, error: &StageError) -> usize {
        match error {
            StageError::NotFound { .. } | StageError::Cancelled => 1,
            StageError::MalformedResponse { .. } => 2.min(self.max_attempts.max(1)),
            StageError::Transient { .. } | StageError::Timeout { .. } => self.max_attempts,
        }
    }

    /// Delay before the next attempt, given the number of attempts already
    /// made (1-indexed: pass 1 after the first failure).
    #[must_use]
    pub fn delay_for_attempt(&self, attempts_made: usize) -> Duration {
        let exponent = attempts_made.saturating_sub(1);
        let base = self.base_delay_ms;
        let max = self.max_delay_ms;

        let delay = match self.backoff {
            BackoffStrategy::Exponential => {
                let exponent = u32::try_from(exponent).unwrap_or(u32::MAX);
                base.saturating_mul(2u64.saturating_pow(exponent)).min(max)
            }
            BackoffStrategy::Linear => base.saturating_mul(attempts_made.max(1) as u64).min(max),
            BackoffStrategy::Constant => base.min(max),
        };

        let jittered = match self.jitter {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                if delay == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=delay)
                }
            }
            JitterStrategy::Equal => {
                let half = delay / 2;
                if half == 0 {
                    delay
                } else {
                    half + rand::thread_rng().gen_range(0..=half)
                }
            }
        };

        Duration::from_millis(jittered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, BackoffStrategy::Exponential);
        assert_eq!(policy.jitter, JitterStrategy::Full);
        assert_eq!(policy.attempt_timeout, Duration::from_secs(30));
        assert!(policy.execution_deadline.is_none());
    }

    #[test]
    fn test_builder() {
        let policy = RetryPolicy::new()
            .with_max_attempts(5)
            .with_base_delay_ms(100)
            .with_max_delay_ms(2_000)
            .with_backoff(BackoffStrategy::Linear)
            .with_jitter(JitterStrategy::None)
            .with_attempt_timeout(Duration::from_secs(5))
            .with_execution_deadline(Duration::from_secs(60));

        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay_ms, 100);
        assert_eq!(policy.backoff, BackoffStrategy::Linear);
        assert_eq!(policy.execution_deadline, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_exponential_delays_no_jitter() {
        let policy = RetryPolicy::new()
            .with_base_delay_ms(100)
            .with_jitter(JitterStrategy::None);

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn test_linear_delays_no_jitter() {
        let policy = RetryPolicy::new()
            .with_base_delay_ms(100)
            .with_backoff(BackoffStrategy::Linear)
            .with_jitter(JitterStrategy::None);

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(300));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let policy = RetryPolicy::new()
            .with_base_delay_ms(1_000)
            .with_max_delay_ms(5_000)
            .with_jitter(JitterStrategy::None);

        assert_eq!(policy.delay_for_attempt(10), Duration::from_millis(5_000));
    }

    #[test]
    fn test_full_jitter_bounded_by_delay() {
        let policy = RetryPolicy::new()
            .with_base_delay_ms(100)
            .with_backoff(BackoffStrategy::Constant)
            .with_jitter(JitterStrategy::Full);

        for _ in 0..10 {
            assert!(policy.delay_for_attempt(1) <= Duration::from_millis(100));
        }
    }

    #[test]
    fn test_attempt_cap_by_classification() {
        let policy = RetryPolicy::new().with_max_attempts(4);

        assert_eq!(policy.attempt_cap(&StageError::not_found("v")), 1);
        assert_eq!(policy.attempt_cap(&StageError::Cancelled), 1);
        assert_eq!(policy.attempt_cap(&StageError::malformed("bad json")), 2);
        assert_eq!(policy.attempt_cap(&StageError::transient("rate limit")), 4);
        assert_eq!(
            policy.attempt_cap(&StageError::Timeout { elapsed_ms: 100 }),
            4
        );
    }
}
