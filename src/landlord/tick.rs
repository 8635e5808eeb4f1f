use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Runs `on_tick` immediately and then once every `interval` until `token` is cancelled.
///
/// Ticks are dropped while a tick takes longer than `interval`. When such a slow tick
/// finishes another tick runs immediately, after which the original cadence resumes.
/// A running tick is never interrupted by cancellation.
pub async fn tick<F, Fut>(token: CancellationToken, interval: Duration, mut on_tick: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = ticker.tick() => on_tick().await,
        }
    }
}
