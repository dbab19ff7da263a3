//! Bounded-parallelism combinator
//!
//! [`for_each_bounded`] spawns one task per item while never letting more
//! than `limit` of them run at once. Admission is gated by a semaphore and
//! the caller's cancellation token is checked before every admission; once
//! it fires no further items start, but admitted tasks run to completion.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Outcome of one [`for_each_bounded`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Admission {
    /// Items that were started
    pub admitted: usize,
    /// Whether admission stopped because the token was cancelled
    pub cancelled: bool,
}

/// Runs `task` for each item with at most `limit` in flight
///
/// Returns after every admitted task has finished. A `limit` of zero is
/// treated as one.
pub async fn for_each_bounded<I, T, F, Fut>(
    items: I,
    limit: usize,
    cancel: &CancellationToken,
    mut task: F,
) -> Admission
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let gate = Arc::new(Semaphore::new(limit.max(1)));
    let mut running = JoinSet::new();
    let mut report = Admission::default();

    for item in items {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }

        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                report.cancelled = true;
                break;
            }
            permit = gate.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        report.admitted += 1;
        let fut = task(item);
        running.spawn(async move {
            let _permit = permit;
            fut.await;
        });
    }

    if report.cancelled {
        debug!(
            admitted = report.admitted,
            "Cancellation requested, waiting for admitted tasks"
        );
    }

    while let Some(joined) = running.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "Bounded task did not complete");
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn peak_never_exceeds_limit() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();

        let report = for_each_bounded(0..25, 4, &token, |_| {
            let active = active.clone();
            let peak = peak.clone();
            let done = done.clone();
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                done.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;

        assert_eq!(report, Admission { admitted: 25, cancelled: false });
        assert_eq!(done.load(Ordering::SeqCst), 25);
        assert!(peak.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test]
    async fn cancelled_token_admits_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let ran = Arc::new(AtomicUsize::new(0));

        let report = for_each_bounded(0..10, 2, &token, |_| {
            let ran = ran.clone();
            async move {
                ran.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;

        assert!(report.cancelled);
        assert_eq!(report.admitted, 0);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancellation_mid_run_stops_admission() {
        let token = CancellationToken::new();
        let ran = Arc::new(AtomicUsize::new(0));

        let report = for_each_bounded(0..10, 1, &token, |_| {
            let ran = ran.clone();
            let token = token.clone();
            async move {
                ran.fetch_add(1, Ordering::SeqCst);
                token.cancel();
            }
        })
        .await;

        assert!(report.cancelled);
        assert_eq!(report.admitted, 1);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_limit_still_makes_progress() {
        let token = CancellationToken::new();
        let report = for_each_bounded(0..3, 0, &token, |_| async {}).await;
        assert_eq!(report.admitted, 3);
    }
}
