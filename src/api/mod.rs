//! HTTP API
//!
//! Read-only JSON endpoints over discovery and analytics, plus a manual
//! refresh. Handler failures are logged and answered with an opaque
//! `{ "error": ... }` body.

pub mod error;
pub mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::analytics::AnalyticsService;
use crate::cache::CacheContext;
use crate::config::Config;
use crate::discovery::PnodeService;
use crate::enrichment::Enricher;
use crate::geo::{GeoProvider, GeoResolver};
use crate::rpc::PodClientFactory;

pub use error::ApiError;

/// Services shared across handlers
pub struct AppState {
    pub caches: CacheContext,
    pub pnodes: Arc<PnodeService>,
    pub analytics: Arc<AnalyticsService>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wire caches, geo, discovery and analytics from one config
    pub fn new(
        config: &Config,
        clients: Arc<dyn PodClientFactory>,
        geo_provider: Arc<dyn GeoProvider>,
    ) -> Self {
        let caches = CacheContext::new(&config.cache);

        let resolver = GeoResolver::new(
            geo_provider,
            caches.geo.clone(),
            Duration::from_secs(config.geo.timeout_secs),
            Duration::from_secs(config.geo.node_timeout_secs),
        );

        let pnodes = Arc::new(PnodeService::new(
            config.network.clone(),
            caches.clone(),
            clients,
            Enricher::new(Arc::new(resolver)),
            config.geo.discovery_concurrency,
        ));
        let analytics = Arc::new(AnalyticsService::new(pnodes.clone()));

        Self {
            caches,
            pnodes,
            analytics,
        }
    }
}

/// Create the API router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        // Nodes
        .route("/api/pnodes", get(routes::list_pnodes))
        .route("/api/pnodes/refresh", post(routes::refresh_pnodes))
        .route("/api/pnodes/by-id/:id", get(routes::get_pnode_by_id))
        .route("/api/pnodes/:pubkey", get(routes::get_pnode))
        .route("/api/pnodes/:pubkey/stats", get(routes::get_pnode_stats))
        .route("/api/uptime-history/:pubkey", get(routes::uptime_history))
        // Analytics
        .route("/api/analytics/summary", get(routes::analytics_summary))
        .route("/api/analytics/metrics", get(routes::analytics_metrics))
        .route("/api/analytics/extended", get(routes::analytics_extended))
        .route("/api/analytics/top-nodes", get(routes::analytics_top_nodes))
        .route("/api/analytics/storage-pressure", get(routes::analytics_storage_pressure))
        .route("/api/analytics/storage", get(routes::analytics_storage))
        .route("/api/analytics/versions", get(routes::analytics_versions))
        .route("/api/analytics/regions", get(routes::analytics_regions))
        .route("/api/analytics/geo", get(routes::analytics_geo))
        .route("/api/network-stats", get(routes::network_stats))
        // Health check
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
