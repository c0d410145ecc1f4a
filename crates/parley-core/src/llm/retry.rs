//! Retry policy for completion calls.
//!
//! The policy is a pure function of (attempt, error) -> Option<delay>; the
//! async driver [`run_with_retry`] sleeps and re-invokes the inner call.
//! Keeping the decision pure makes the schedule testable without a clock.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use parley_types::llm::UpstreamError;

/// Bounded exponential backoff for transient upstream failures.
///
/// Defaults match the production schedule: 3 total attempts with delays of
/// 2s and 4s between them (the schedule continues 8s, capped at
/// `max_delay`, for larger attempt budgets).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first (1 means no retries).
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles each retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// The backoff delay following a failed `attempt` (1-based):
    /// `base * 2^(attempt-1)`, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Decide whether to retry after `error` on `attempt` (1-based).
    ///
    /// Returns the delay to wait before the next attempt, or `None` when the
    /// error is permanent or the attempt budget is exhausted.
    pub fn next_delay(&self, attempt: u32, error: &UpstreamError) -> Option<Duration> {
        if !error.is_transient() || attempt >= self.max_attempts {
            return None;
        }
        Some(self.delay_for(attempt))
    }
}

/// Drive `op` through the policy: invoke, and on a transient failure sleep
/// and re-invoke until success, a permanent error, or exhaustion.
///
/// Exhausting retries surfaces the last transient failure. `op` receives the
/// 1-based attempt number.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, UpstreamError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => match policy.next_delay(attempt, &error) {
                Some(delay) => {
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        %error,
                        "transient completion failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => return Err(error),
            },
        }
    }
}
