//! Bounded polling: repeat an async operation at a fixed interval until a
//! predicate settles or a hard deadline elapses.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Final state of a [`poll_until`] loop.
#[derive(Debug)]
pub(crate) struct PollOutcome<T> {
    /// Most recent successful operation result, if any attempt succeeded.
    pub last: Option<T>,
    /// Whether the predicate accepted a result before the deadline.
    pub settled: bool,
    /// Attempts made, counting failed ones.
    pub attempts: usize,
    /// Wall time spent in the loop.
    pub waited: Duration,
}

/// Polls `operation` every `interval` until `is_settled` accepts a result
/// or `deadline` elapses, whichever comes first.
///
/// An operation error counts as "not yet settled": the loop keeps the
/// previous result and continues. The final sleep is capped to the time
/// remaining on a monotonic clock, so the loop never outlives the
/// deadline.
pub(crate) async fn poll_until<T, F, Fut, P>(
    interval: Duration,
    deadline: Duration,
    mut operation: F,
    mut is_settled: P,
) -> PollOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: FnMut(&T) -> bool,
{
    let start = Instant::now();
    let mut last = None;
    let mut attempts = 0;

    loop {
        attempts += 1;
        match operation().await {
            Ok(value) => {
                let settled = is_settled(&value);
                last = Some(value);
                if settled {
                    return PollOutcome {
                        last,
                        settled: true,
                        attempts,
                        waited: start.elapsed(),
                    };
                }
            }
            Err(err) => {
                tracing::debug!(
                    attempt = attempts,
                    error = %err,
                    "poll attempt failed; treating as pending"
                );
            }
        }

        let remaining = deadline.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            break;
        }
        sleep(interval.min(remaining)).await;
    }

    PollOutcome {
        last,
        settled: false,
        attempts,
        waited: start.elapsed(),
    }
}
