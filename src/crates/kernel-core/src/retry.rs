//! Retry backoff policies for agent invocations.
//!
//! An agent invocation that fails is retried up to `max_retries` times with a
//! delay between attempts governed by one of three backoff strategies. The
//! policy only computes delays; the loop that sleeps, re-invokes and gives up
//! lives in the orchestrator crate next to the circuit breaker it shares
//! state with.
//!
//! ```
//! use kernel_core::retry::{BackoffStrategy, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(3, BackoffStrategy::Exponential)
//!     .with_base(Duration::from_secs(1))
//!     .with_max_delay(Duration::from_secs(30));
//!
//! assert!(policy.should_retry(0));
//! assert!(!policy.should_retry(3));
//! ```

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Backoff shape for the delay between retry attempt `k` and `k+1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// `min(base * 2^k, max_delay)`
    Exponential,
    /// `min(base * k, max_delay)`
    Linear,
    /// `min(base * fib(k+2), max_delay)`
    Fibonacci,
}

impl std::str::FromStr for BackoffStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exponential" => Ok(BackoffStrategy::Exponential),
            "linear" => Ok(BackoffStrategy::Linear),
            "fibonacci" => Ok(BackoffStrategy::Fibonacci),
            other => Err(format!("unknown retry policy '{other}'")),
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        BackoffStrategy::Exponential
    }
}

/// Up to `max_retries` attempts, delayed per `strategy`, plus uniform jitter
/// in `[0, 0.1 * delay]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub strategy: BackoffStrategy,
    pub base: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, strategy: BackoffStrategy) -> Self {
        Self {
            max_retries,
            strategy,
            base: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }

    pub fn with_base(mut self, base: Duration) -> Self {
        self.base = base;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Whether attempt index `attempt` (0-based) is still within budget.
    pub fn should_retry(&self, attempt: usize) -> bool {
        attempt < self.max_retries
    }

    /// Delay before the `(attempt + 1)`th invocation, including jitter.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let base_secs = self.base.as_secs_f64();
        let max_secs = self.max_delay.as_secs_f64();
        let k = attempt as u32;

        let raw = match self.strategy {
            BackoffStrategy::Exponential => base_secs * 2f64.powi(k as i32),
            BackoffStrategy::Linear => base_secs * (attempt as f64),
            BackoffStrategy::Fibonacci => base_secs * fibonacci(attempt + 2) as f64,
        };
        let capped = raw.min(max_secs).max(0.0);

        let jitter = rand::thread_rng().gen_range(0.0..=0.1 * capped);
        Duration::from_secs_f64(capped + jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, BackoffStrategy::Exponential)
    }
}

/// Standard Fibonacci sequence, `fib(0) = 0`, `fib(1) = 1`.
fn fibonacci(n: usize) -> u64 {
    let (mut a, mut b) = (0u64, 1u64);
    for _ in 0..n {
        let next = a + b;
        a = b;
        b = next;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter_delay(policy: &RetryPolicy, attempt: usize) -> f64 {
        // jitter is in [0, 0.1*delay]; lower bound is the pure formula value.
        let lower = policy.delay_for_attempt(attempt).as_secs_f64();
        lower
    }

    #[test]
    fn exponential_matches_formula_within_jitter_band() {
        let policy = RetryPolicy::new(5, BackoffStrategy::Exponential)
            .with_base(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(100));

        for k in 0..4 {
            let expected = 2f64.powi(k as i32);
            let got = no_jitter_delay(&policy, k);
            assert!(got >= expected, "attempt {k}: {got} < {expected}");
            assert!(got <= expected * 1.1 + 1e-9, "attempt {k}: {got} > {}", expected * 1.1);
        }
    }

    #[test]
    fn linear_matches_formula() {
        let policy = RetryPolicy::new(5, BackoffStrategy::Linear)
            .with_base(Duration::from_secs(2))
            .with_max_delay(Duration::from_secs(100));
        let got = no_jitter_delay(&policy, 3);
        assert!(got >= 6.0 && got <= 6.6);
    }

    #[test]
    fn fibonacci_matches_formula() {
        let policy = RetryPolicy::new(5, BackoffStrategy::Fibonacci)
            .with_base(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(100));
        // k=0 -> fib(2) = 1
        let got0 = no_jitter_delay(&policy, 0);
        assert!(got0 >= 1.0 && got0 <= 1.1);
        // k=2 -> fib(4) = 3
        let got2 = no_jitter_delay(&policy, 2);
        assert!(got2 >= 3.0 && got2 <= 3.3);
    }

    #[test]
    fn delay_is_capped_at_max_delay() {
        let policy = RetryPolicy::new(10, BackoffStrategy::Exponential)
            .with_base(Duration::from_secs(10))
            .with_max_delay(Duration::from_secs(50));
        let got = policy.delay_for_attempt(5).as_secs_f64();
        assert!(got <= 55.0);
    }

    #[test]
    fn should_retry_respects_max_retries() {
        let policy = RetryPolicy::new(3, BackoffStrategy::Linear);
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn strategy_parses_from_str() {
        use std::str::FromStr;
        assert_eq!(
            BackoffStrategy::from_str("fibonacci").unwrap(),
            BackoffStrategy::Fibonacci
        );
        assert!(BackoffStrategy::from_str("bogus").is_err());
    }
}
