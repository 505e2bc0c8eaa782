use crate::pipeline::flush::FlushReconciler;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Flush worker: runs a reconciliation pass every `interval` and one final
/// pass when `shutdown` is cancelled.
pub async fn run_flush_worker(
    reconciler: Arc<FlushReconciler>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut flush_timer = time::interval(interval);
    flush_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    flush_timer.tick().await; // skip first immediate tick

    loop {
        tokio::select! {
            _ = flush_timer.tick() => {
                reconciler.flush_all().await;
            }
            _ = shutdown.cancelled() => {
                tracing::info!("shutdown requested, flushing analytics");
                let report = reconciler.flush_all().await;
                if report.failed > 0 {
                    tracing::error!(failed = report.failed, "final flush left counters behind");
                }
                return;
            }
        }
    }
}
