use crate::counter::keys::CounterKey;
use async_trait::async_trait;
use chrono::NaiveDate;
use deadpool_sqlite::Pool;
use rusqlite::params;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("pool error: {0}")]
    Pool(#[from] deadpool_sqlite::PoolError),

    #[error("interact error: {0}")]
    Interact(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// One durable per-project, per-day row.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DailyTotals {
    pub date: NaiveDate,
    pub pv: i64,
    pub uv: i64,
}

/// Durable table of daily visit totals. Written only by the flush reconciler.
#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Create the row for `key`, or raise an existing row to the given totals.
    /// A stored total is never lowered: an in-memory counter store restarts
    /// from zero and must not erase what an earlier pass persisted.
    /// Returns `false` when the project no longer exists and nothing was written.
    async fn upsert_day(&self, key: CounterKey, pv: i64, uv: i64) -> Result<bool, AggregateError>;

    /// Rows for `project_id` with `from <= date <= to`, oldest first.
    async fn range(
        &self,
        project_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyTotals>, AggregateError>;
}

#[derive(Clone)]
pub struct SqliteAggregateStore {
    pool: Pool,
}

impl SqliteAggregateStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AggregateStore for SqliteAggregateStore {
    async fn upsert_day(&self, key: CounterKey, pv: i64, uv: i64) -> Result<bool, AggregateError> {
        let conn = self.pool.get().await?;
        let now = chrono::Utc::now().timestamp();
        let date = key.date.format("%Y-%m-%d").to_string();

        let written = conn
            .interact(move |conn| {
                conn.execute(
                    "INSERT INTO analytics (project_id, date, pv, uv, created_at, updated_at)
                     SELECT ?1, ?2, ?3, ?4, ?5, ?5
                     WHERE EXISTS (SELECT 1 FROM projects WHERE id = ?1)
                     ON CONFLICT (project_id, date) DO UPDATE SET
                        pv         = MAX(pv, excluded.pv),
                        uv         = MAX(uv, excluded.uv),
                        updated_at = excluded.updated_at",
                    params![key.project_id, date, pv, uv, now],
                )
            })
            .await
            .map_err(|e| AggregateError::Interact(e.to_string()))??;

        Ok(written > 0)
    }

    async fn range(
        &self,
        project_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyTotals>, AggregateError> {
        let conn = self.pool.get().await?;
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();

        let rows = conn
            .interact(move |conn| {
                let mut stmt = conn.prepare_cached(
                    "SELECT date, pv, uv FROM analytics
                     WHERE project_id = ?1 AND date >= ?2 AND date <= ?3
                     ORDER BY date ASC",
                )?;
                let rows = stmt
                    .query_map(params![project_id, from, to], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, i64>(2)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok::<_, rusqlite::Error>(rows)
            })
            .await
            .map_err(|e| AggregateError::Interact(e.to_string()))??;

        Ok(rows
            .into_iter()
            .filter_map(|(date, pv, uv)| {
                let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok()?;
                Some(DailyTotals { date, pv, uv })
            })
            .collect())
    }
}
