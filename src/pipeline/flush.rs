use crate::counter::keys::{CounterKey, PAGE_VIEW_PREFIX};
use crate::counter::{bounded, SharedCounterStore, StoreError};
use crate::storage::analytics::{AggregateError, AggregateStore};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum FlushError {
    #[error("counter store: {0}")]
    Store(#[from] StoreError),

    #[error("aggregate store: {0}")]
    Aggregate(#[from] AggregateError),
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Counter keys whose totals were written to the aggregate table.
    pub flushed: usize,
    /// Closed-day keys deleted from the counter store after a successful write.
    pub retired: usize,
    /// Keys whose project no longer exists; dropped without a row.
    pub orphaned: usize,
    /// Keys that failed and stay in the counter store for the next pass.
    pub failed: usize,
    /// Malformed or already-expired keys.
    pub skipped: usize,
}

enum KeyOutcome {
    Flushed,
    Retired,
    Orphaned,
    Vanished,
}

/// Copies buffered counters into the durable per-day table.
///
/// Each pass writes the current counter values into the rows, so running it
/// twice over the same counters yields the same rows. Counters for days
/// before `today` are deleted once persisted; today's stay live as the
/// running total. Every counter-store call is bounded by `op_timeout`, so a
/// stalled store fails the affected keys instead of holding the pass.
pub struct FlushReconciler {
    store: SharedCounterStore,
    aggregates: Arc<dyn AggregateStore>,
    op_timeout: Duration,
    pass: Mutex<()>,
}

impl FlushReconciler {
    pub fn new(
        store: SharedCounterStore,
        aggregates: Arc<dyn AggregateStore>,
        op_timeout: Duration,
    ) -> Self {
        Self {
            store,
            aggregates,
            op_timeout,
            pass: Mutex::new(()),
        }
    }

    pub async fn flush_all(&self) -> FlushReport {
        self.flush_all_as_of(chrono::Local::now().date_naive()).await
    }

    /// Run one pass treating `today` as the current local date.
    pub async fn flush_all_as_of(&self, today: NaiveDate) -> FlushReport {
        let _pass = self.pass.lock().await;
        let mut report = FlushReport::default();

        let listing = bounded(self.op_timeout, self.store.list_keys_matching(PAGE_VIEW_PREFIX));
        let keys = match listing.await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::error!(error = %e, "failed to list counter keys, skipping flush");
                return report;
            }
        };

        for raw in keys {
            let Some(key) = CounterKey::parse_page_views(&raw) else {
                tracing::warn!(key = %raw, "skipping malformed counter key");
                report.skipped += 1;
                continue;
            };

            match self.flush_key(key, today).await {
                Ok(KeyOutcome::Flushed) => report.flushed += 1,
                Ok(KeyOutcome::Retired) => {
                    report.flushed += 1;
                    report.retired += 1;
                }
                Ok(KeyOutcome::Orphaned) => report.orphaned += 1,
                Ok(KeyOutcome::Vanished) => report.skipped += 1,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        project_id = key.project_id,
                        date = %key.date,
                        "failed to flush counters, will retry next pass"
                    );
                    report.failed += 1;
                }
            }
        }

        if report.flushed > 0 || report.failed > 0 {
            tracing::info!(
                flushed = report.flushed,
                retired = report.retired,
                orphaned = report.orphaned,
                failed = report.failed,
                skipped = report.skipped,
                "analytics flush complete"
            );
        }

        report
    }

    async fn flush_key(&self, key: CounterKey, today: NaiveDate) -> Result<KeyOutcome, FlushError> {
        let pv_key = key.page_views();
        let uv_key = key.unique_visitors();

        // Set size before counter: every member was counted as a view first.
        let uv = bounded(self.op_timeout, self.store.get_set_size(&uv_key)).await?;
        let pv = bounded(self.op_timeout, self.store.get_value(&pv_key)).await?;

        if pv == 0 {
            // Expired between listing and reading.
            return Ok(KeyOutcome::Vanished);
        }
        let uv = uv.min(pv);

        if !self.aggregates.upsert_day(key, pv, uv).await? {
            tracing::warn!(project_id = key.project_id, "dropping counters for missing project");
            self.retire(&pv_key, &uv_key).await;
            return Ok(KeyOutcome::Orphaned);
        }

        if key.date < today && self.retire(&pv_key, &uv_key).await {
            return Ok(KeyOutcome::Retired);
        }

        Ok(KeyOutcome::Flushed)
    }

    /// Delete both keys. A failure leaves them for the next pass, which
    /// rewrites the same totals.
    async fn retire(&self, pv_key: &str, uv_key: &str) -> bool {
        let mut ok = true;
        for key in [pv_key, uv_key] {
            if let Err(e) = bounded(self.op_timeout, self.store.delete(key)).await {
                tracing::warn!(error = %e, key, "failed to delete flushed counter");
                ok = false;
            }
        }
        ok
    }
}
