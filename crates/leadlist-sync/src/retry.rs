//! Timeout, bounded retry, and circuit breaking around remote calls.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::warn;

use crate::error::TransportError;

/// Per-call timeout and retry budget.
///
/// Only [retryable](TransportError::is_retryable) failures are retried. The
/// delay doubles after each attempt, capped at `max_backoff`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// One attempt, no retry, with the given timeout.
    pub fn single(timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            timeout,
            ..Self::default()
        }
    }

    /// Delay before attempt `attempt + 1` (attempts count from 1).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `call` under this policy.
    ///
    /// `breaker` is consulted once, before the first attempt. If failures
    /// during the run open it, retrying stops and the last transport error is
    /// returned.
    pub async fn run<T, F, Fut>(
        &self,
        op: &str,
        breaker: &CircuitBreaker,
        mut call: F,
    ) -> Result<T, TransportError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        breaker.check()?;
        loop {
            attempt += 1;

            let result = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout),
            };

            match result {
                Ok(value) => {
                    breaker.record_success();
                    return Ok(value);
                }
                Err(err) if err.is_retryable() => {
                    breaker.record_failure();
                    if attempt >= max_attempts || breaker.is_open() {
                        return Err(err);
                    }
                    let delay = self.backoff(attempt);
                    warn!(
                        op,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying remote call"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    // The service answered, so it is reachable.
                    breaker.record_success();
                    return Err(err);
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct BreakerState {
    consecutive_failures: u32,
    open_until: Option<Instant>,
    trial_in_flight: bool,
}

/// Fails fast after `threshold` consecutive transport failures, for
/// `cooldown`. After the cooldown one trial call is let through and every
/// other caller is refused until it resolves; a failure reopens the
/// circuit, a success closes it.
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown,
            state: Mutex::new(BreakerState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn check(&self) -> Result<(), TransportError> {
        let mut state = self.lock();
        if state.trial_in_flight {
            return Err(TransportError::CircuitOpen);
        }
        if let Some(until) = state.open_until {
            if Instant::now() < until {
                return Err(TransportError::CircuitOpen);
            }
            // Half-open: the next failure trips it again.
            state.open_until = None;
            state.consecutive_failures = self.threshold - 1;
            state.trial_in_flight = true;
        }
        Ok(())
    }

    pub fn record_success(&self) {
        let mut state = self.lock();
        state.consecutive_failures = 0;
        state.open_until = None;
        state.trial_in_flight = false;
    }

    pub fn record_failure(&self) {
        let mut state = self.lock();
        state.trial_in_flight = false;
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        if state.consecutive_failures >= self.threshold {
            warn!(
                failures = state.consecutive_failures,
                cooldown_ms = self.cooldown.as_millis() as u64,
                "opening circuit"
            );
            state.open_until = Some(Instant::now() + self.cooldown);
        }
    }

    pub fn is_open(&self) -> bool {
        self.lock()
            .open_until
            .is_some_and(|until| Instant::now() < until)
    }
}
