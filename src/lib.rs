//! pnode-monitor: discovery, caching and analytics for the pNode storage network
//!
//! Polls seed pNodes over pRPC, normalizes and deduplicates the gossip view
//! of the network, enriches nodes with geolocation and serves derived
//! health metrics to the dashboard over HTTP.

pub mod analytics;
pub mod api;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod enrichment;
pub mod error;
pub mod format;
pub mod geo;
pub mod history;
pub mod models;
pub mod rpc;

pub use analytics::AnalyticsService;
pub use api::{create_router, AppState};
pub use cache::{CacheContext, CacheStore};
pub use config::Config;
pub use discovery::PnodeService;
pub use models::{Node, NodeMetrics, NodeStatus, Pod};
