//! Network analytics
//!
//! Aggregates are pure functions over a node/pod snapshot; `AnalyticsService`
//! wires them to discovery and keeps per-node metrics in the analytics cache.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use crate::cache::AnalyticsEntry;
use crate::discovery::PnodeService;
use crate::error::DiscoveryError;
use crate::format::{
    health_score, is_recently_seen, network_health, node_tier, percentage, round2,
    uptime_24h, utilization, BYTES_PER_TB,
};
use crate::models::{
    AnalyticsSummary, CountryCount, ExtendedSummary, GeoSummary, NetworkHealth, NetworkStats,
    Node, NodeMetrics, Pod, RegionCount, RegionStats, StorageAnalytics, StoragePressure, TopNode,
    VersionDistribution,
};

pub const NODE_METRICS_CACHE_KEY: &str = "computed_node_metrics";
pub const TOP_NODES_LIMIT: usize = 10;
pub const TOP_REGIONS_LIMIT: usize = 5;
/// Utilization above this percentage counts as storage pressure
pub const HIGH_PRESSURE_UTILIZATION: f64 = 80.0;

const UNKNOWN_VERSION: &str = "unknown";

/// Counts keyed by label, iterated in first-seen order
struct Tally {
    index: HashMap<String, usize>,
    entries: Vec<(String, usize)>,
}

impl Tally {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn add(&mut self, label: &str) {
        match self.index.get(label) {
            Some(&i) => self.entries[i].1 += 1,
            None => {
                self.index.insert(label.to_string(), self.entries.len());
                self.entries.push((label.to_string(), 1));
            }
        }
    }

    /// Entries by count descending; ties keep first-seen order
    fn ranked(mut self) -> Vec<(String, usize)> {
        self.entries.sort_by(|a, b| b.1.cmp(&a.1));
        self.entries
    }
}

fn version_label(node: &Node) -> &str {
    if node.version.is_empty() {
        UNKNOWN_VERSION
    } else {
        &node.version
    }
}

/// One metrics entry per raw pod that matches a discovered node.
///
/// Pods without a pubkey, pods with no discovered node and repeated
/// pubkeys after the first are skipped.
pub fn compute_node_metrics(pods: &[Pod], nodes: &[Node]) -> Vec<NodeMetrics> {
    let by_pubkey: HashMap<&str, &Node> = nodes.iter().map(|n| (n.pubkey.as_str(), n)).collect();
    let mut seen = HashSet::new();
    let mut metrics = Vec::with_capacity(pods.len());

    for pod in pods {
        let Some(pubkey) = pod.pubkey.as_deref().filter(|k| !k.is_empty()) else {
            continue;
        };
        let Some(node) = by_pubkey.get(pubkey) else {
            continue;
        };
        if !seen.insert(pubkey) {
            continue;
        }

        let uptime = uptime_24h(pod.uptime.unwrap_or(0));
        let storage_utilization =
            utilization(pod.storage_used.unwrap_or(0), pod.storage_committed.unwrap_or(0));
        let score = health_score(uptime, storage_utilization, node.is_online());

        metrics.push(NodeMetrics {
            pubkey: pubkey.to_string(),
            health_score: score,
            uptime_24h: uptime,
            storage_utilization,
            tier: node_tier(score),
        });
    }

    metrics
}

/// Most frequent version; on a tie the first version seen wins
pub fn consensus_version(nodes: &[Node]) -> String {
    let mut tally = Tally::new();
    for node in nodes {
        tally.add(version_label(node));
    }

    let mut consensus = UNKNOWN_VERSION.to_string();
    let mut max_count = 0;
    for (version, count) in tally.entries {
        if count > max_count {
            max_count = count;
            consensus = version;
        }
    }
    consensus
}

/// Network-wide summary.
///
/// Active pods come from the raw records, independent of node status.
pub fn summarize(
    nodes: &[Node],
    pods: &[Pod],
    now: DateTime<Utc>,
    online_threshold_secs: u64,
) -> AnalyticsSummary {
    let total_pnodes = nodes.len();
    let online: Vec<&Node> = nodes.iter().filter(|n| n.is_online()).collect();
    let online_percentage = percentage(online.len(), total_pnodes);

    let uptimes: Vec<f64> = online.iter().map(|n| n.uptime).filter(|u| *u > 0.0).collect();
    let average_uptime = if uptimes.is_empty() {
        0.0
    } else {
        round2(uptimes.iter().sum::<f64>() / uptimes.len() as f64)
    };

    let active_pods = pods
        .iter()
        .filter(|p| is_recently_seen(p.last_seen_timestamp, now, online_threshold_secs))
        .count();

    let total_storage_used: u64 = nodes.iter().map(|n| n.storage_used).sum();
    let total_storage_capacity: u64 = pods
        .iter()
        .filter_map(|p| p.storage_committed)
        .filter(|c| *c > 0)
        .sum();

    AnalyticsSummary {
        total_pnodes,
        online_pnodes: online.len(),
        online_percentage,
        total_pods: pods.len(),
        active_pods,
        average_uptime,
        total_storage_used,
        total_storage_capacity,
        total_storage_used_tb: total_storage_used as f64 / BYTES_PER_TB,
        total_storage_capacity_tb: total_storage_capacity as f64 / BYTES_PER_TB,
        network_health: network_health(online_percentage),
        consensus_version: consensus_version(nodes),
    }
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        round2(sum / count as f64)
    }
}

pub fn extended_summary(metrics: &[NodeMetrics], nodes: &[Node]) -> ExtendedSummary {
    if metrics.is_empty() {
        return ExtendedSummary {
            total_pnodes: 0,
            online_percentage: 0.0,
            average_uptime_24h: 0.0,
            average_health_score: 0.0,
            storage_pressure_percent: 0.0,
            network_health: NetworkHealth::Unstable,
        };
    }

    let measured: HashSet<&str> = metrics.iter().map(|m| m.pubkey.as_str()).collect();
    let online = nodes
        .iter()
        .filter(|n| n.is_online() && measured.contains(n.pubkey.as_str()))
        .count();
    let online_percentage = percentage(online, metrics.len());

    ExtendedSummary {
        total_pnodes: metrics.len(),
        online_percentage,
        average_uptime_24h: average(metrics.iter().map(|m| m.uptime_24h)),
        average_health_score: average(metrics.iter().map(|m| m.health_score)),
        storage_pressure_percent: storage_pressure(metrics).percent,
        network_health: network_health(online_percentage),
    }
}

/// Highest health scores first; equal scores keep their input order
pub fn top_nodes(metrics: &[NodeMetrics], limit: usize) -> Vec<TopNode> {
    let mut ranked: Vec<&NodeMetrics> = metrics.iter().collect();
    ranked.sort_by(|a, b| b.health_score.total_cmp(&a.health_score));
    ranked
        .into_iter()
        .take(limit)
        .map(|m| TopNode {
            pubkey: m.pubkey.clone(),
            health_score: m.health_score,
            uptime_24h: m.uptime_24h,
        })
        .collect()
}

pub fn storage_pressure(metrics: &[NodeMetrics]) -> StoragePressure {
    let high_pressure_nodes = metrics
        .iter()
        .filter(|m| m.storage_utilization > HIGH_PRESSURE_UTILIZATION)
        .count();

    StoragePressure {
        high_pressure_nodes,
        total_nodes: metrics.len(),
        percent: percentage(high_pressure_nodes, metrics.len()),
    }
}

pub fn storage_analytics(nodes: &[Node]) -> Vec<StorageAnalytics> {
    nodes
        .iter()
        .map(|n| StorageAnalytics {
            pubkey: n.pubkey.clone(),
            storage_used: n.storage_used,
            storage_total: n.storage_total,
            utilization_percent: utilization(n.storage_used, n.storage_total),
        })
        .collect()
}

pub fn version_distribution(nodes: &[Node]) -> Vec<VersionDistribution> {
    let mut tally = Tally::new();
    for node in nodes {
        tally.add(version_label(node));
    }
    tally
        .ranked()
        .into_iter()
        .map(|(version, count)| VersionDistribution { version, count })
        .collect()
}

/// Per-region totals, largest first, truncated to `limit`
pub fn regional_distribution(nodes: &[Node], limit: usize) -> Vec<RegionStats> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut regions: Vec<RegionStats> = Vec::new();

    for node in nodes {
        let i = *index.entry(node.region.as_str()).or_insert_with(|| {
            regions.push(RegionStats {
                region: node.region.clone(),
                total: 0,
                online: 0,
            });
            regions.len() - 1
        });
        regions[i].total += 1;
        if node.is_online() {
            regions[i].online += 1;
        }
    }

    regions.sort_by(|a, b| b.total.cmp(&a.total));
    regions.truncate(limit);
    regions
}

/// Country and region counts over located nodes only
pub fn geo_summary(nodes: &[Node]) -> GeoSummary {
    let mut countries = Tally::new();
    let mut regions = Tally::new();
    for node in nodes.iter().filter(|n| n.has_geo()) {
        countries.add(&node.country);
        regions.add(&node.region);
    }

    GeoSummary {
        countries: countries
            .ranked()
            .into_iter()
            .map(|(country, count)| CountryCount { country, count })
            .collect(),
        regions: regions
            .ranked()
            .into_iter()
            .map(|(region, count)| RegionCount { region, count })
            .collect(),
    }
}

/// Analytics over the live discovery snapshot
pub struct AnalyticsService {
    pnodes: Arc<PnodeService>,
}

impl AnalyticsService {
    pub fn new(pnodes: Arc<PnodeService>) -> Self {
        Self { pnodes }
    }

    /// Per-node metrics, recomputed at most once per analytics TTL
    pub async fn node_metrics(&self) -> Result<Arc<Vec<NodeMetrics>>, DiscoveryError> {
        let cache = &self.pnodes.caches().analytics;
        if let Some(AnalyticsEntry::NodeMetrics(metrics)) = cache.get(NODE_METRICS_CACHE_KEY) {
            return Ok(metrics);
        }

        let (pods, nodes) = tokio::join!(
            self.pnodes.get_raw_pods_for_analytics(),
            self.pnodes.get_all_nodes()
        );
        let pods = pods?;

        let metrics = Arc::new(compute_node_metrics(&pods, &nodes));
        debug!(count = metrics.len(), "Computed node metrics");
        cache.set(
            NODE_METRICS_CACHE_KEY,
            AnalyticsEntry::NodeMetrics(metrics.clone()),
            None,
        );
        Ok(metrics)
    }

    pub async fn summary(&self) -> Result<AnalyticsSummary, DiscoveryError> {
        let nodes = self.pnodes.get_all_nodes().await;
        let pods = self.pnodes.get_raw_pods_for_analytics().await?;
        Ok(summarize(
            &nodes,
            &pods,
            Utc::now(),
            self.pnodes.online_threshold_secs(),
        ))
    }

    pub async fn network_stats(&self) -> Result<NetworkStats, DiscoveryError> {
        Ok(NetworkStats::from(&self.summary().await?))
    }

    pub async fn extended_summary(&self) -> Result<ExtendedSummary, DiscoveryError> {
        let metrics = self.node_metrics().await?;
        let nodes = self.pnodes.get_all_nodes().await;
        Ok(extended_summary(&metrics, &nodes))
    }

    pub async fn top_nodes(&self) -> Result<Vec<TopNode>, DiscoveryError> {
        Ok(top_nodes(&self.node_metrics().await?, TOP_NODES_LIMIT))
    }

    pub async fn storage_pressure(&self) -> Result<StoragePressure, DiscoveryError> {
        Ok(storage_pressure(&self.node_metrics().await?))
    }

    pub async fn storage_analytics(&self) -> Vec<StorageAnalytics> {
        storage_analytics(&self.pnodes.get_all_nodes().await)
    }

    pub async fn version_distribution(&self) -> Vec<VersionDistribution> {
        version_distribution(&self.pnodes.get_all_nodes().await)
    }

    pub async fn regional_distribution(&self) -> Vec<RegionStats> {
        regional_distribution(&self.pnodes.get_all_nodes().await, TOP_REGIONS_LIMIT)
    }

    pub async fn geo_summary(&self) -> GeoSummary {
        geo_summary(&self.pnodes.get_all_nodes().await)
    }
}
