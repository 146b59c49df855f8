//! Per-agent circuit breaker state.
//!
//! Tracks a rolling failure count per agent name. Once the count reaches
//! `failure_threshold` the breaker opens and short-circuits calls for
//! `timeout`; after that it half-opens, letting exactly the next call
//! through as a trial. A successful call resets the counter to closed.
//!
//! This module only holds the state machine; the code that actually calls
//! an agent and decides when to record a success/failure lives in the
//! orchestrator crate so it can own the async timeout and sleep.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    failure_count: u32,
    failure_threshold: u32,
    last_failure_at: Option<Instant>,
    timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, timeout: Duration) -> Self {
        Self {
            failure_count: 0,
            failure_threshold,
            last_failure_at: None,
            timeout,
        }
    }

    /// Current state, accounting for whether `timeout` has elapsed since the
    /// failure that tripped the breaker.
    pub fn state(&self) -> BreakerState {
        if self.failure_count < self.failure_threshold {
            return BreakerState::Closed;
        }
        match self.last_failure_at {
            Some(t) if t.elapsed() >= self.timeout => BreakerState::HalfOpen,
            _ => BreakerState::Open,
        }
    }

    /// Whether a call should be allowed through right now.
    pub fn allow_call(&self) -> bool {
        !matches!(self.state(), BreakerState::Open)
    }

    pub fn record_success(&mut self) {
        self.failure_count = 0;
        self.last_failure_at = None;
    }

    pub fn record_failure(&mut self) {
        self.failure_count += 1;
        self.last_failure_at = Some(Instant::now());
    }
}

/// Process-global, per-agent-name breaker registry.
pub struct BreakerRegistry {
    breakers: dashmap::DashMap<String, CircuitBreaker>,
    failure_threshold: u32,
    timeout: Duration,
}

impl BreakerRegistry {
    pub fn new(failure_threshold: u32, timeout: Duration) -> Self {
        Self {
            breakers: dashmap::DashMap::new(),
            failure_threshold,
            timeout,
        }
    }

    pub fn allow_call(&self, agent: &str) -> bool {
        self.breakers
            .entry(agent.to_string())
            .or_insert_with(|| CircuitBreaker::new(self.failure_threshold, self.timeout))
            .allow_call()
    }

    pub fn record_success(&self, agent: &str) {
        if let Some(mut breaker) = self.breakers.get_mut(agent) {
            breaker.record_success();
        }
    }

    pub fn record_failure(&self, agent: &str) {
        self.breakers
            .entry(agent.to_string())
            .or_insert_with(|| CircuitBreaker::new(self.failure_threshold, self.timeout))
            .record_failure();
    }

    pub fn state_of(&self, agent: &str) -> BreakerState {
        self.breakers
            .get(agent)
            .map(|b| b.state())
            .unwrap_or(BreakerState::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_failures() {
        let mut breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        assert_eq!(breaker.state(), BreakerState::Closed);
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(!breaker.allow_call());
    }

    #[test]
    fn success_resets_counter() {
        let mut breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed, "counter should have reset");
    }

    #[test]
    fn half_opens_after_timeout_elapses() {
        let mut breaker = CircuitBreaker::new(1, Duration::from_millis(1));
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        assert!(breaker.allow_call());
    }

    #[test]
    fn registry_tracks_independent_agents() {
        let registry = BreakerRegistry::new(1, Duration::from_secs(60));
        registry.record_failure("a");
        assert!(!registry.allow_call("a"));
        assert!(registry.allow_call("b"));
    }
}
