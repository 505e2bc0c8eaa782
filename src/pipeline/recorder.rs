use crate::counter::keys::CounterKey;
use crate::counter::{bounded, SharedCounterStore};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

/// Buffers page views and unique visitors in the counter store.
///
/// Recording is best-effort: failures are logged and never reach the
/// request that triggered them.
pub struct VisitRecorder {
    store: SharedCounterStore,
    op_timeout: Duration,
}

impl VisitRecorder {
    pub fn new(store: SharedCounterStore, op_timeout: Duration) -> Self {
        Self { store, op_timeout }
    }

    /// Record one page view for `project_id` on the server's local date.
    pub async fn record_visit(&self, project_id: i64, visitor: &str) {
        let today = chrono::Local::now().date_naive();
        self.record_visit_on(project_id, visitor, today).await;
    }

    pub async fn record_visit_on(&self, project_id: i64, visitor: &str, date: NaiveDate) {
        let key = CounterKey::new(project_id, date);

        // Page view first: a reader taking the set size before the counter
        // then never sees more visitors than views.
        let pv_key = key.page_views();
        if let Err(e) = bounded(self.op_timeout, self.store.increment(&pv_key)).await {
            tracing::warn!(error = %e, project_id, key = %pv_key, "failed to record page view");
        }

        let uv_key = key.unique_visitors();
        if let Err(e) = bounded(self.op_timeout, self.store.add_to_set(&uv_key, visitor)).await {
            tracing::warn!(error = %e, project_id, key = %uv_key, "failed to record unique visitor");
        }
    }
}

pub type SharedRecorder = Arc<VisitRecorder>;
