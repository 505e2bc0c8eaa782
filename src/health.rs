use crate::counter::{bounded, SharedCounterStore};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use deadpool_sqlite::Pool;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub struct HealthState {
    pub pool: Pool,
    pub counters: SharedCounterStore,
    pub op_timeout: Duration,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub db_ok: bool,
    pub counter_store_ok: bool,
}

/// GET /health
pub async fn health(State(state): State<Arc<HealthState>>) -> Json<HealthResponse> {
    let db_ok = match state.pool.get().await {
        Ok(conn) => conn
            .interact(|conn| conn.execute_batch("SELECT 1"))
            .await
            .map(|r| r.is_ok())
            .unwrap_or(false),
        Err(_) => false,
    };

    let counter_store_ok = bounded(state.op_timeout, state.counters.ping()).await.is_ok();

    Json(HealthResponse {
        status: if db_ok && counter_store_ok {
            "ok".into()
        } else {
            "degraded".into()
        },
        db_ok,
        counter_store_ok,
    })
}

pub fn router(state: Arc<HealthState>) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}
