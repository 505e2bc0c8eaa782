use crate::storage::analytics::DailyTotals;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    pub days: Option<i64>,
}

impl SummaryParams {
    pub const DEFAULT_DAYS: i64 = 30;
    pub const MAX_DAYS: i64 = 365;

    /// Requested window, or `None` when out of range.
    pub fn days(&self) -> Option<i64> {
        let days = self.days.unwrap_or(Self::DEFAULT_DAYS);
        (1..=Self::MAX_DAYS).contains(&days).then_some(days)
    }
}

/// Totals over a window of durable daily rows.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct AnalyticsSummary {
    pub total_pv: i64,
    pub total_uv: i64,
    pub today_pv: i64,
    pub today_uv: i64,
    pub trend_data: Vec<DailyTotals>,
}

impl AnalyticsSummary {
    /// Summing daily `uv` counts a returning visitor once per day.
    pub fn from_rows(rows: Vec<DailyTotals>, today: NaiveDate) -> Self {
        let mut summary = Self {
            total_pv: 0,
            total_uv: 0,
            today_pv: 0,
            today_uv: 0,
            trend_data: Vec::with_capacity(rows.len()),
        };
        for row in rows {
            summary.total_pv += row.pv;
            summary.total_uv += row.uv;
            if row.date == today {
                summary.today_pv = row.pv;
                summary.today_uv = row.uv;
            }
            summary.trend_data.push(row);
        }
        summary
    }
}
