//! Data model shared by discovery, analytics and the HTTP API
//!
//! `Pod` is the raw record as the pRPC layer reports it. `Node` is the
//! canonical post-normalization shape. Everything else is derived and
//! recomputed per cache cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Placeholder for geo fields that have not been enriched yet
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Raw pod record from `get-pods` / `get-pods-with-stats`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pod {
    #[serde(default)]
    pub pubkey: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// Unix seconds
    #[serde(default)]
    pub last_seen_timestamp: i64,
    /// Seconds since the pod process started
    #[serde(default, deserialize_with = "lenient_u64")]
    pub uptime: Option<u64>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub storage_used: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub storage_committed: Option<u64>,
    #[serde(default)]
    pub storage_usage_percent: Option<f64>,
    #[serde(default)]
    pub rpc_port: Option<u16>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

/// Read a counter that pods sometimes report as a float or a string.
/// Negative or non-numeric values read as `None`.
pub fn as_counter(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(as_counter))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Online,
    Offline,
    Degraded,
}

/// Canonical pNode snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub pubkey: String,
    /// Short display id, `node-` + first 8 chars of the pubkey
    pub id: String,
    pub status: NodeStatus,
    /// `host:port` as reported
    pub address: String,
    pub ip: String,
    pub last_seen: DateTime<Utc>,
    pub uptime_seconds: u64,
    /// 24h uptime percentage, capped at 100
    pub uptime: f64,
    pub version: String,
    pub storage_used: u64,
    pub storage_total: u64,
    pub storage_committed: u64,
    #[serde(rename = "storageUsedGB")]
    pub storage_used_gb: f64,
    #[serde(rename = "storageCapacityGB")]
    pub storage_capacity_gb: f64,
    pub region: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram_total: Option<u64>,
}

impl Node {
    pub fn is_online(&self) -> bool {
        self.status == NodeStatus::Online
    }

    /// True once region and country both carry real values
    pub fn has_geo(&self) -> bool {
        self.region != UNKNOWN_LOCATION && self.country != UNKNOWN_LOCATION
    }

    /// Copy of this node with all geo fields taken from `geo`
    pub fn with_geo(&self, geo: &GeoLocation) -> Node {
        Node {
            region: geo.region.clone(),
            country: geo.country.clone(),
            city: geo.city.clone(),
            lat: Some(geo.lat),
            lng: Some(geo.lng),
            ..self.clone()
        }
    }

    /// Copy of this node with RAM fields taken from live stats
    pub fn with_stats(&self, stats: &NodeStats) -> Node {
        Node {
            ram_used: Some(stats.ram_used),
            ram_total: Some(stats.ram_total),
            ..self.clone()
        }
    }
}

/// Live per-node stats from the node's own `get-stats` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStats {
    pub ram_used: u64,
    pub ram_total: u64,
    pub storage_used: u64,
    pub storage_committed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub lat: f64,
    pub lng: f64,
    pub country: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Premium,
    Standard,
    Basic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkHealth {
    Healthy,
    Degraded,
    Unstable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetrics {
    pub pubkey: String,
    pub health_score: f64,
    pub uptime_24h: f64,
    pub storage_utilization: f64,
    pub tier: Tier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    #[serde(rename = "totalPNodes")]
    pub total_pnodes: usize,
    #[serde(rename = "onlinePNodes")]
    pub online_pnodes: usize,
    pub online_percentage: f64,
    pub total_pods: usize,
    pub active_pods: usize,
    pub average_uptime: f64,
    pub total_storage_used: u64,
    pub total_storage_capacity: u64,
    #[serde(rename = "totalStorageUsedTB")]
    pub total_storage_used_tb: f64,
    #[serde(rename = "totalStorageCapacityTB")]
    pub total_storage_capacity_tb: f64,
    pub network_health: NetworkHealth,
    pub consensus_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedSummary {
    #[serde(rename = "totalPNodes")]
    pub total_pnodes: usize,
    pub online_percentage: f64,
    pub average_uptime_24h: f64,
    pub average_health_score: f64,
    pub storage_pressure_percent: f64,
    pub network_health: NetworkHealth,
}

/// Flattened summary for simple dashboards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStats {
    pub total_nodes: usize,
    pub online_nodes: usize,
    pub offline_nodes: usize,
    pub degraded_nodes: usize,
    #[serde(rename = "totalStorageCapacityTB")]
    pub total_storage_capacity_tb: f64,
    #[serde(rename = "totalStorageUsedTB")]
    pub total_storage_used_tb: f64,
    pub average_uptime: f64,
    pub network_health_score: f64,
    pub consensus_version: String,
    pub total_pods: usize,
    pub active_pods: usize,
}

impl From<&AnalyticsSummary> for NetworkStats {
    fn from(summary: &AnalyticsSummary) -> Self {
        Self {
            total_nodes: summary.total_pnodes,
            online_nodes: summary.online_pnodes,
            offline_nodes: summary.total_pnodes.saturating_sub(summary.online_pnodes),
            // Not distinguished from offline at this level
            degraded_nodes: 0,
            total_storage_capacity_tb: summary.total_storage_capacity_tb,
            total_storage_used_tb: summary.total_storage_used_tb,
            average_uptime: summary.average_uptime,
            network_health_score: summary.online_percentage,
            consensus_version: summary.consensus_version.clone(),
            total_pods: summary.total_pods,
            active_pods: summary.active_pods,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopNode {
    pub pubkey: String,
    pub health_score: f64,
    pub uptime_24h: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoragePressure {
    pub high_pressure_nodes: usize,
    pub total_nodes: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAnalytics {
    pub pubkey: String,
    pub storage_used: u64,
    pub storage_total: u64,
    pub utilization_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDistribution {
    pub version: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionStats {
    pub region: String,
    pub total: usize,
    pub online: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryCount {
    pub country: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionCount {
    pub region: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoSummary {
    pub countries: Vec<CountryCount>,
    pub regions: Vec<RegionCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UptimeDataPoint {
    pub timestamp: DateTime<Utc>,
    pub uptime: f64,
}
