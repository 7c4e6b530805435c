//! Bounded retry on an unsatisfied result.
//!
//! This is not a retry-on-error helper: an `Err` from the operation ends the
//! loop immediately. Only `Ok` values rejected by the predicate are re-read.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// How many times to run an operation and how long to wait between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Fixed delay between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(100),
        }
    }
}

/// Run `op` until `accept` returns true for its value or the attempts run out.
///
/// Returns the first accepted value, or the value of the last attempt.
/// Attempts are strictly sequential: attempt N+1 starts only after
/// attempt N has resolved and the delay has elapsed.
pub async fn retry_until<T, E, Op, Fut, Accept>(
    policy: RetryPolicy,
    mut op: Op,
    accept: Accept,
) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    Accept: Fn(&T) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let value = op().await?;
        if accept(&value) || attempt >= max_attempts {
            return Ok(value);
        }
        debug!(attempt, max_attempts, "Result not accepted, retrying");
        tokio::time::sleep(policy.delay).await;
        attempt += 1;
    }
}
