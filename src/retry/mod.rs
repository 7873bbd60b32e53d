//! Bounded retries with capped exponential backoff.
//!
//! A call with `max_retries = N` makes at most `N + 1` attempts. Before every
//! attempt after the first, the engine sleeps `min(base * 2^attempt, cap)`.
//! Which failures are worth retrying is a [`RetryPolicy`] decision: the
//! default [`RetryAll`] retries every failure kind uniformly, matching the
//! product's historical behavior; [`SkipClientErrors`] is the drop-in
//! alternative that treats 4xx responses as terminal.
//!
//! Backoff sleeps happen outside any lock and outside the per-attempt
//! deadline — each attempt gets a fresh timeout window.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::error::ApiError;

/// Exponential backoff schedule with an upper cap.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
}

impl Backoff {
    /// Creates a schedule growing from `base` and never exceeding `cap`.
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// The delay slept before attempt `attempt` (attempt 0 has no delay).
    ///
    /// Grows as `base * 2^attempt`, saturating at the cap. Non-decreasing in
    /// the attempt index.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        let delay = self.base.saturating_mul(factor);
        delay.min(self.cap)
    }
}

impl Default for Backoff {
    /// 100 ms base, 5 s cap.
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(5))
    }
}

/// Strategy deciding whether a failed attempt should be retried.
///
/// The retry *budget* is enforced by the engine; the policy only classifies
/// the error. Swapping the policy changes retry behavior without touching
/// the orchestrator.
pub trait RetryPolicy: Send + Sync {
    /// Returns `true` if an attempt that failed with `error` may be retried.
    fn is_retryable(&self, error: &ApiError) -> bool;
}

/// Retries every failure kind uniformly up to the budget. The default.
///
/// `NetworkUnavailable` never reaches the engine — the orchestrator
/// short-circuits it before the first attempt.
pub struct RetryAll;

impl RetryPolicy for RetryAll {
    fn is_retryable(&self, _error: &ApiError) -> bool {
        true
    }
}

/// Retries everything except 4xx responses, which the server will keep
/// rejecting no matter how often they are resent.
pub struct SkipClientErrors;

impl RetryPolicy for SkipClientErrors {
    fn is_retryable(&self, error: &ApiError) -> bool {
        !error.is_client_error()
    }
}

/// Drives `attempt_fn` through up to `max_retries + 1` attempts.
///
/// `attempt_fn` receives the zero-based attempt index. The last observed
/// error is surfaced when the budget is exhausted or the policy declares the
/// failure terminal.
pub async fn run_with_retry<T, F, Fut>(
    policy: &dyn RetryPolicy,
    backoff: Backoff,
    max_retries: u32,
    mut attempt_fn: F,
) -> Result<T, ApiError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0;
    loop {
        let delay = backoff.delay_for(attempt);
        if !delay.is_zero() {
            sleep(delay).await;
        }

        match attempt_fn(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt >= max_retries || !policy.is_retryable(&error) {
                    return Err(error);
                }
                debug!(attempt, error = %error, "attempt failed, retrying");
                attempt += 1;
            }
        }
    }
}
