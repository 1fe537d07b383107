//! API handlers

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
};
use chrono::Utc;
use serde::Serialize;

use super::{ApiError, SharedState};
use crate::history::synthesize_uptime_history;
use crate::models::{
    AnalyticsSummary, ExtendedSummary, GeoSummary, NetworkStats, Node, NodeMetrics, NodeStats,
    RegionStats, StorageAnalytics, StoragePressure, TopNode, UptimeDataPoint, VersionDistribution,
};

const NODE_NOT_FOUND: &str = "Node not found";

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    "OK"
}

#[derive(Serialize)]
pub struct NodesResponse {
    pub nodes: Vec<Node>,
    pub count: usize,
}

impl NodesResponse {
    fn new(nodes: &[Node]) -> Self {
        Self {
            nodes: nodes.to_vec(),
            count: nodes.len(),
        }
    }
}

#[derive(Serialize)]
pub struct NodeResponse {
    pub node: Node,
}

#[derive(Serialize)]
pub struct NodeStatsResponse {
    pub stats: NodeStats,
}

#[derive(Serialize)]
pub struct MetricsResponse {
    pub metrics: Vec<NodeMetrics>,
    pub count: usize,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub history: Vec<UptimeDataPoint>,
}

/// GET /api/pnodes
pub async fn list_pnodes(State(state): State<SharedState>) -> Json<NodesResponse> {
    let nodes = state.pnodes.get_all_nodes().await;
    Json(NodesResponse::new(&nodes))
}

/// POST /api/pnodes/refresh
pub async fn refresh_pnodes(State(state): State<SharedState>) -> Json<NodesResponse> {
    let nodes = state.pnodes.refresh().await;
    Json(NodesResponse::new(&nodes))
}

/// GET /api/pnodes/:pubkey
pub async fn get_pnode(
    State(state): State<SharedState>,
    Path(pubkey): Path<String>,
) -> Result<Json<NodeResponse>, ApiError> {
    state
        .pnodes
        .get_node_by_pubkey(&pubkey)
        .await
        .map(|node| Json(NodeResponse { node }))
        .ok_or(ApiError::NotFound(NODE_NOT_FOUND))
}

/// GET /api/pnodes/by-id/:id
pub async fn get_pnode_by_id(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<NodeResponse>, ApiError> {
    state
        .pnodes
        .get_node_by_id(&id)
        .await
        .map(|node| Json(NodeResponse { node }))
        .ok_or(ApiError::NotFound(NODE_NOT_FOUND))
}

/// GET /api/pnodes/:pubkey/stats
pub async fn get_pnode_stats(
    State(state): State<SharedState>,
    Path(pubkey): Path<String>,
) -> Result<Json<NodeStatsResponse>, ApiError> {
    state
        .pnodes
        .get_node_stats(&pubkey)
        .await
        .map(|stats| Json(NodeStatsResponse { stats }))
        .ok_or(ApiError::NotFound("Stats not available"))
}

/// GET /api/uptime-history/:pubkey
pub async fn uptime_history(
    State(state): State<SharedState>,
    Path(pubkey): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let node = state
        .pnodes
        .get_node_by_pubkey(&pubkey)
        .await
        .ok_or(ApiError::NotFound(NODE_NOT_FOUND))?;

    let history = synthesize_uptime_history(node.uptime, Utc::now(), &mut rand::thread_rng());
    Ok(Json(HistoryResponse { history }))
}

/// GET /api/analytics/summary
pub async fn analytics_summary(
    State(state): State<SharedState>,
) -> Result<Json<AnalyticsSummary>, ApiError> {
    let summary = state
        .analytics
        .summary()
        .await
        .map_err(ApiError::internal("Failed to fetch analytics summary"))?;
    Ok(Json(summary))
}

/// GET /api/network-stats
pub async fn network_stats(
    State(state): State<SharedState>,
) -> Result<Json<NetworkStats>, ApiError> {
    let stats = state
        .analytics
        .network_stats()
        .await
        .map_err(ApiError::internal("Failed to fetch network stats"))?;
    Ok(Json(stats))
}

/// GET /api/analytics/metrics
pub async fn analytics_metrics(
    State(state): State<SharedState>,
) -> Result<Json<MetricsResponse>, ApiError> {
    let metrics = state
        .analytics
        .node_metrics()
        .await
        .map_err(ApiError::internal("Failed to fetch node metrics"))?;
    Ok(Json(MetricsResponse {
        count: metrics.len(),
        metrics: metrics.to_vec(),
    }))
}

/// GET /api/analytics/extended
pub async fn analytics_extended(
    State(state): State<SharedState>,
) -> Result<Json<ExtendedSummary>, ApiError> {
    let summary = state
        .analytics
        .extended_summary()
        .await
        .map_err(ApiError::internal("Failed to fetch extended summary"))?;
    Ok(Json(summary))
}

/// GET /api/analytics/top-nodes
pub async fn analytics_top_nodes(
    State(state): State<SharedState>,
) -> Result<Json<Vec<TopNode>>, ApiError> {
    let top = state
        .analytics
        .top_nodes()
        .await
        .map_err(ApiError::internal("Failed to fetch top nodes"))?;
    Ok(Json(top))
}

/// GET /api/analytics/storage-pressure
pub async fn analytics_storage_pressure(
    State(state): State<SharedState>,
) -> Result<Json<StoragePressure>, ApiError> {
    let pressure = state
        .analytics
        .storage_pressure()
        .await
        .map_err(ApiError::internal("Failed to fetch storage pressure"))?;
    Ok(Json(pressure))
}

/// GET /api/analytics/storage
pub async fn analytics_storage(State(state): State<SharedState>) -> Json<Vec<StorageAnalytics>> {
    Json(state.analytics.storage_analytics().await)
}

/// GET /api/analytics/versions
pub async fn analytics_versions(
    State(state): State<SharedState>,
) -> Json<Vec<VersionDistribution>> {
    Json(state.analytics.version_distribution().await)
}

/// GET /api/analytics/regions
pub async fn analytics_regions(State(state): State<SharedState>) -> Json<Vec<RegionStats>> {
    Json(state.analytics.regional_distribution().await)
}

/// GET /api/analytics/geo
pub async fn analytics_geo(State(state): State<SharedState>) -> Json<GeoSummary> {
    Json(state.analytics.geo_summary().await)
}
