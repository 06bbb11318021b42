//! Bounded polling for contended leases
//!
//! Turns a try-once acquisition into a blocking call with a hard
//! deadline. The sleeping task holds nothing, so fairness among waiters
//! is whoever wins the next poll race.

use std::future::Future;
use std::time::{Duration, Instant};

/// Retry `attempt` every `poll_interval` until it yields a value or
/// `timeout` elapses
///
/// The deadline is absolute, measured from entry; overshoot is bounded by
/// one poll interval. Errors from `attempt` end the wait immediately.
pub async fn poll_until<T, E, F, Fut>(
    poll_interval: Duration,
    timeout: Duration,
    mut attempt: F,
) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(found) = attempt().await? {
            return Ok(Some(found));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(poll_interval).await;
    }
}
