pub mod handler;
pub mod types;

use crate::auth::bearer::{require_api_token, ApiToken};
use crate::project::ProjectDirectory;
use crate::storage::analytics::AggregateStore;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

/// Shared state for the analytics read API.
pub struct AnalyticsState {
    pub aggregates: Arc<dyn AggregateStore>,
    pub projects: ProjectDirectory,
}

/// Analytics routes behind the API token. Without a token the API is not
/// mounted at all.
pub fn router(state: Arc<AnalyticsState>, api_token: Option<&str>) -> Router {
    let Some(token) = api_token else {
        tracing::info!("auth.api_token not set, analytics API disabled");
        return Router::new();
    };

    Router::new()
        .route("/api/projects/{id}/analytics", get(handler::project_analytics))
        .layer(middleware::from_fn(require_api_token))
        .layer(axum::Extension(ApiToken::new(token)))
        .with_state(state)
}
