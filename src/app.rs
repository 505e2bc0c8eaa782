use crate::analytics::{self, AnalyticsState};
use crate::auth::cookie::AccessSigner;
use crate::config::AppConfig;
use crate::counter::{self, SharedCounterStore, StoreError};
use crate::fingerprint::IpUserAgentFingerprint;
use crate::health::{self, HealthState};
use crate::pipeline::flush::FlushReconciler;
use crate::pipeline::recorder::VisitRecorder;
use crate::project::ProjectDirectory;
use crate::site::{self, assets::AssetStore, gate::AccessGate, handler::SiteState, rewrite::ContentRewriter};
use crate::storage::analytics::{AggregateStore, SqliteAggregateStore};
use axum::http::{header, HeaderValue};
use axum::Router;
use deadpool_sqlite::Pool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// The wired service: HTTP routes plus the handles the binary needs to run
/// the background flush.
pub struct App {
    pub router: Router,
    pub reconciler: Arc<FlushReconciler>,
}

impl App {
    /// Connect the counter store and assemble every route over `pool`.
    pub async fn build(config: &AppConfig, pool: Pool) -> Result<Self, StoreError> {
        let counters = counter::connect(&config.counter_store).await?;
        Ok(Self::with_counter_store(config, pool, counters))
    }

    pub fn with_counter_store(config: &AppConfig, pool: Pool, counters: SharedCounterStore) -> Self {
        let op_timeout = Duration::from_millis(config.counter_store.op_timeout_ms);
        let aggregates: Arc<dyn AggregateStore> = Arc::new(SqliteAggregateStore::new(pool.clone()));
        let projects = ProjectDirectory::new(pool.clone());

        let recorder = Arc::new(VisitRecorder::new(counters.clone(), op_timeout));
        let reconciler = Arc::new(FlushReconciler::new(
            counters.clone(),
            aggregates.clone(),
            op_timeout,
        ));

        let site_state = Arc::new(SiteState {
            gate: AccessGate::new(projects.clone(), AccessSigner::new(&config.auth.cookie_secret)),
            recorder,
            fingerprint: Arc::new(IpUserAgentFingerprint),
            assets: AssetStore::new(&config.sites.data_dir),
            rewriter: ContentRewriter::new(config.sites.replacements.clone()),
            secure_cookies: config.sites.secure_cookies,
            trust_forwarded_for: config.server.trust_forwarded_for,
        });

        let analytics_state = Arc::new(AnalyticsState {
            aggregates,
            projects,
        });

        let health_state = Arc::new(HealthState {
            pool,
            counters,
            op_timeout,
        });

        let router = Router::new()
            .merge(health::router(health_state))
            .merge(site::router(site_state))
            .merge(analytics::router(analytics_state, config.auth.api_token.as_deref()))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::REFERRER_POLICY,
                HeaderValue::from_static("strict-origin-when-cross-origin"),
            ))
            .layer(TraceLayer::new_for_http());

        Self { router, reconciler }
    }
}
