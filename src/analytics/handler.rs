use crate::analytics::types::{AnalyticsSummary, SummaryParams};
use crate::analytics::AnalyticsState;
use crate::error::{AppError, AppResult};
use axum::extract::{Path, Query, State};
use axum::Json;
use std::sync::Arc;

/// GET /api/projects/{id}/analytics - daily trend plus today's and window totals.
pub async fn project_analytics(
    State(state): State<Arc<AnalyticsState>>,
    Path(project_id): Path<i64>,
    Query(params): Query<SummaryParams>,
) -> AppResult<Json<AnalyticsSummary>> {
    let days = params.days().ok_or_else(|| {
        AppError::Validation(format!(
            "days must be between 1 and {}",
            SummaryParams::MAX_DAYS
        ))
    })?;

    if state.projects.find_by_id(project_id).await?.is_none() {
        return Err(AppError::NotFound(format!("project {project_id} not found")));
    }

    let today = chrono::Local::now().date_naive();
    let from = today - chrono::Days::new(days as u64);
    let rows = state.aggregates.range(project_id, from, today).await?;

    Ok(Json(AnalyticsSummary::from_rows(rows, today)))
}
