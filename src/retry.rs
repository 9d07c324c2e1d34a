//! Bounded fixed-delay retry.
//!
//! Hosted model APIs enforce per-minute quotas; when one is exhausted the
//! only useful response is to wait for the window to reset. [`RetryPolicy`]
//! captures that as a value (max attempts, fixed delay) and takes the
//! retryable-error predicate at the call site, so the policy itself can be
//! tested with tokio's paused clock instead of real sleeps.

use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::warn;

/// How often and how patiently to retry an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always ≥ 1.
    pub max_attempts: u32,
    /// Wait between two consecutive attempts.
    pub delay: Duration,
}

/// Why [`RetryPolicy::run`] gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error; `last` is the final one.
    Exhausted { attempts: u32, last: E },
    /// An attempt failed with an error the predicate refused to retry.
    Aborted { attempt: u32, error: E },
}

impl RetryPolicy {
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Run `op` until it succeeds, fails non-retryably, or attempts run out.
    ///
    /// `op` receives the 1-indexed attempt number. The delay is slept only
    /// between attempts, never after the last one: `n` attempts cost at most
    /// `n - 1` delays. On success the attempt count is returned alongside
    /// the value.
    pub async fn run<T, E, F, Fut, P>(&self, mut op: F, is_retryable: P) -> Result<(T, u32), RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let max = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok((value, attempt)),
                Err(error) if !is_retryable(&error) => {
                    return Err(RetryError::Aborted { attempt, error });
                }
                Err(error) if attempt >= max => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: error,
                    });
                }
                Err(_) => {
                    warn!(
                        "attempt {}/{} hit a retryable error, waiting {:?}",
                        attempt, max, self.delay
                    );
                    sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
