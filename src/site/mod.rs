//! Public static-site serving: access gate, file delivery and rewriting.

pub mod assets;
pub mod gate;
pub mod handler;
pub mod pages;
pub mod rewrite;

use axum::routing::get;
use axum::Router;
use handler::SiteState;
use std::sync::Arc;

pub fn router(state: Arc<SiteState>) -> Router {
    Router::new()
        .route("/s/{name}", get(handler::serve_site_root))
        .route("/s/{name}/", get(handler::serve_site_root))
        .route("/s/{name}/{*path}", get(handler::serve_site_path))
        .route("/auth/{name}", get(handler::site_auth_page))
        .with_state(state)
}
