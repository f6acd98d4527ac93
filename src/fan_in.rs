//! Fan-out/fan-in helpers shared by the fetch and enrich stages.

use std::future::Future;
use std::time::Duration;

use futures::future::try_join_all;

/// Join every future, failing fast on the first error.
///
/// All futures are polled concurrently and results keep input order. On the
/// first error the remaining futures are dropped, so their in-flight requests
/// are ignored rather than awaited.
pub async fn join_all_fail_fast<I, F, T, E>(futures: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    try_join_all(futures).await
}

/// Linear stagger: the `index`-th request waits `index * step`.
pub fn stagger_delay(index: usize, step: Duration) -> Duration {
    step.saturating_mul(u32::try_from(index).unwrap_or(u32::MAX))
}

/// Run `fut` after `delay` elapses on the timer, without holding a thread.
pub async fn scheduled<F: Future>(delay: Duration, fut: F) -> F::Output {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    fut.await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consecutive_stagger_delays_differ_by_one_step() {
        let step = Duration::from_millis(100);
        assert_eq!(stagger_delay(0, step), Duration::ZERO);
        for i in 0..50 {
            assert_eq!(
                stagger_delay(i + 1, step) - stagger_delay(i, step),
                Duration::from_millis(100)
            );
        }
    }

    #[tokio::test]
    async fn join_all_fail_fast_keeps_order() {
        let futs = (0..5).map(|i| async move { Ok::<_, String>(i * 2) });
        assert_eq!(join_all_fail_fast(futs).await.unwrap(), vec![0, 2, 4, 6, 8]);
    }

    #[tokio::test]
    async fn join_all_fail_fast_surfaces_the_error() {
        let futs = (0..5).map(|i| async move {
            if i == 3 {
                Err(format!("boom at {i}"))
            } else {
                Ok(i)
            }
        });
        assert_eq!(join_all_fail_fast(futs).await.unwrap_err(), "boom at 3");
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_waits_for_its_delay() {
        let start = tokio::time::Instant::now();
        scheduled(Duration::from_millis(300), async {}).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(300) && elapsed < Duration::from_millis(301));
    }
}
