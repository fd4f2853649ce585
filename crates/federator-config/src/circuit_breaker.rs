//! A sliding-window circuit breaker guarding calls to a single management node. There is
//! no off-the-shelf breaker crate in use anywhere in this codebase's dependency stack, so
//! this is hand-rolled the way [`federator_common::RetryPolicy`] is: a small, data-only
//! struct with explicit state rather than a generic framework.
//!
//! States: `Closed` (calls proceed, failures tracked over a sliding window), `Open`
//! (calls rejected until `open_duration` elapses), `HalfOpen` (one probe call is allowed
//! through; success closes the breaker, failure reopens it).

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use federator_common::FederatorError;

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    /// Fraction of failures within the window, at or above which the breaker opens.
    pub failure_rate_threshold: f64,
    /// Minimum number of recorded calls before the failure rate is evaluated; avoids
    /// opening on a single failure right after a restart.
    pub minimum_calls: u32,
    /// Number of recent outcomes kept for the failure-rate calculation.
    pub window_size: u32,
    /// How long the breaker stays `Open` before allowing a probe call.
    pub open_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            minimum_calls: 5,
            window_size: 20,
            open_duration: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum State {
    Closed,
    Open(Instant),
    HalfOpen,
}

struct Inner {
    state: State,
    recent: VecDeque<bool>,
}

pub struct CircuitBreaker {
    key: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(key: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            key: key.into(),
            config,
            inner: Mutex::new(Inner {
                state: State::Closed,
                recent: VecDeque::with_capacity(config.window_size as usize),
            }),
        }
    }

    /// Call before attempting the guarded operation. Returns `Err(CircuitOpen)` if the
    /// breaker is open and hasn't yet reached its cooldown; transitions `Open` to
    /// `HalfOpen` (and allows the call through) once the cooldown has elapsed.
    pub fn guard(&self) -> Result<(), FederatorError> {
        let mut inner = self.inner.lock().expect("poisoned circuit breaker");
        match inner.state {
            State::Open(opened_at) => {
                if opened_at.elapsed() >= self.config.open_duration {
                    inner.state = State::HalfOpen;
                    Ok(())
                } else {
                    Err(FederatorError::CircuitOpen {
                        key: self.key.clone(),
                    })
                }
            }
            State::Closed | State::HalfOpen => Ok(()),
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock().expect("poisoned circuit breaker");
        if matches!(inner.state, State::HalfOpen) {
            inner.state = State::Closed;
            inner.recent.clear();
            return;
        }
        push(&mut inner.recent, true, self.config.window_size);
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().expect("poisoned circuit breaker");
        if matches!(inner.state, State::HalfOpen) {
            inner.state = State::Open(Instant::now());
            inner.recent.clear();
            return;
        }

        push(&mut inner.recent, false, self.config.window_size);

        if inner.recent.len() as u32 >= self.config.minimum_calls {
            let failures = inner.recent.iter().filter(|ok| !**ok).count() as f64;
            let rate = failures / inner.recent.len() as f64;
            if rate >= self.config.failure_rate_threshold {
                inner.state = State::Open(Instant::now());
                inner.recent.clear();
            }
        }
    }
}

fn push(recent: &mut VecDeque<bool>, outcome: bool, window_size: u32) {
    recent.push_back(outcome);
    while recent.len() as u32 > window_size {
        recent.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(
            "test-node",
            CircuitBreakerConfig {
                failure_rate_threshold: 0.5,
                minimum_calls: 4,
                window_size: 10,
                open_duration: Duration::from_millis(20),
            },
        )
    }

    #[test]
    fn stays_closed_below_minimum_calls() {
        let cb = breaker();
        cb.record_failure();
        cb.record_failure();
        cb.record_failure();
        assert!(cb.guard().is_ok());
    }

    #[test]
    fn opens_once_failure_rate_crosses_threshold() {
        let cb = breaker();
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        cb.record_failure();
        assert!(matches!(cb.guard(), Err(FederatorError::CircuitOpen { .. })));
    }

    #[test]
    fn half_opens_after_cooldown_then_closes_on_success() {
        let cb = breaker();
        for _ in 0..4 {
            cb.record_failure();
        }
        assert!(cb.guard().is_err());
        std::thread::sleep(Duration::from_millis(30));
        assert!(cb.guard().is_ok());
        cb.record_success();
        assert!(cb.guard().is_ok());
    }

    #[test]
    fn half_open_failure_reopens_immediately() {
        let cb = breaker();
        for _ in 0..4 {
            cb.record_failure();
        }
        std::thread::sleep(Duration::from_millis(30));
        assert!(cb.guard().is_ok());
        cb.record_failure();
        assert!(cb.guard().is_err());
    }
}
