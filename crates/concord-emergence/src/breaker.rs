//! Per-variant circuit breaker: failure-isolation state driven by
//! metric-threshold crossings in `track_performance`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChange {
    pub from: CircuitState,
    pub to: CircuitState,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreaker {
    pub state: CircuitState,
    pub failure_count: u64,
    pub success_count: u64,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub failure_threshold: u32,
    pub reset_timeout_seconds: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure_time: Option<DateTime<Utc>>,
    pub state_changes: Vec<StateChange>,
    pub half_open_success_threshold: u32,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_timeout_seconds: i64, half_open_success_threshold: u32) -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            consecutive_failures: 0,
            consecutive_successes: 0,
            failure_threshold,
            reset_timeout_seconds,
            last_failure_time: None,
            state_changes: Vec::new(),
            half_open_success_threshold,
        }
    }

    fn transition(&mut self, to: CircuitState) {
        if self.state == to {
            return;
        }
        self.state_changes.push(StateChange { from: self.state, to, timestamp: Utc::now() });
        self.state = to;
    }

    pub fn record_failure(&mut self) {
        self.failure_count += 1;
        self.consecutive_failures += 1;
        self.consecutive_successes = 0;
        self.last_failure_time = Some(Utc::now());

        match self.state {
            CircuitState::HalfOpen => self.transition(CircuitState::Open),
            CircuitState::Closed if self.consecutive_failures >= self.failure_threshold => self.transition(CircuitState::Open),
            _ => {}
        }
    }

    pub fn record_success(&mut self) {
        self.success_count += 1;
        self.consecutive_successes += 1;
        self.consecutive_failures = 0;

        if self.state == CircuitState::HalfOpen && self.consecutive_successes >= self.half_open_success_threshold {
            self.transition(CircuitState::Closed);
        }
    }

    /// Whether a request should be allowed through. `open` transitions
    /// to `half_open` once the reset timeout has elapsed, as a side
    /// effect of the check itself (mirrors the component design's
    /// "transition to half_open and return true" wording).
    pub fn can_proceed(&mut self) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed_ok = self
                    .last_failure_time
                    .map(|t| Utc::now() - t >= chrono::Duration::seconds(self.reset_timeout_seconds))
                    .unwrap_or(true);
                if elapsed_ok {
                    self.transition(CircuitState::HalfOpen);
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn is_flapping(&self, window_minutes: i64, threshold: usize) -> bool {
        let cutoff = Utc::now() - chrono::Duration::minutes(window_minutes);
        self.state_changes.iter().filter(|c| c.timestamp >= cutoff).count() >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_consecutive_failures_reach_threshold() {
        let mut cb = CircuitBreaker::new(3, 30, 3);
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state, CircuitState::Closed);
        cb.record_failure();
        assert_eq!(cb.state, CircuitState::Open);
    }

    #[test]
    fn never_transitions_directly_from_open_to_closed() {
        let mut cb = CircuitBreaker::new(1, 0, 3);
        cb.record_failure();
        assert_eq!(cb.state, CircuitState::Open);
        // reset_timeout_seconds=0, so can_proceed immediately half-opens.
        assert!(cb.can_proceed());
        assert_eq!(cb.state, CircuitState::HalfOpen);
        for _ in 0..3 {
            cb.record_success();
        }
        assert_eq!(cb.state, CircuitState::Closed);
        let closed_directly_from_open = cb
            .state_changes
            .iter()
            .any(|c| c.from == CircuitState::Open && c.to == CircuitState::Closed);
        assert!(!closed_directly_from_open);
    }

    #[test]
    fn single_failure_in_half_open_reopens() {
        let mut cb = CircuitBreaker::new(1, 0, 3);
        cb.record_failure();
        cb.can_proceed();
        assert_eq!(cb.state, CircuitState::HalfOpen);
        cb.record_failure();
        assert_eq!(cb.state, CircuitState::Open);
    }

    #[test]
    fn half_open_closes_after_exact_success_threshold() {
        let mut cb = CircuitBreaker::new(1, 0, 3);
        cb.record_failure();
        cb.can_proceed();
        cb.record_success();
        cb.record_success();
        assert_eq!(cb.state, CircuitState::HalfOpen);
        cb.record_success();
        assert_eq!(cb.state, CircuitState::Closed);
    }
}
