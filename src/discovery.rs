//! pNode discovery
//!
//! One discovery cycle:
//! 1. Ask the primary seed for `get-pods-with-stats`, falling back to
//!    `get-pods` on the same host.
//! 2. Normalize each record, skipping the ones that fail.
//! 3. If nothing usable came back, walk the remaining seeds in order with
//!    the shorter fallback timeout (plain `get-pods` only) and stop at the
//!    first one that yields a node.
//! 4. Deduplicate by pubkey (first wins), enrich with geo data and cache.
//!
//! Exhausting every seed is not an error: the cycle yields an empty list.
//! Concurrent cache misses each run their own cycle; the last write wins.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::{AnalyticsEntry, CacheContext};
use crate::config::NetworkConfig;
use crate::enrichment::Enricher;
use crate::error::DiscoveryError;
use crate::format::{address_host, normalize_pod};
use crate::models::{as_counter, Node, NodeStats, Pod};
use crate::rpc::{PodClient, PodClientFactory};

pub const NODE_CACHE_KEY: &str = "pnodes";
pub const RAW_PODS_CACHE_KEY: &str = "pods_raw_analytics";

pub fn node_stats_cache_key(pubkey: &str) -> String {
    format!("node_stats_{}", pubkey)
}

/// Normalize a batch of raw pods, dropping records that cannot be normalized
pub fn normalize_all(pods: &[Pod], now: DateTime<Utc>, online_threshold_secs: u64) -> Vec<Node> {
    pods.iter()
        .filter_map(|pod| match normalize_pod(pod, now, online_threshold_secs) {
            Ok(node) => Some(node),
            Err(e) => {
                debug!(error = %e, address = ?pod.address, "Skipping pod record");
                None
            }
        })
        .collect()
}

/// Keep the first node seen for each pubkey, preserving order
pub fn dedupe_by_pubkey(nodes: Vec<Node>) -> Vec<Node> {
    let mut seen = HashSet::with_capacity(nodes.len());
    nodes
        .into_iter()
        .filter(|node| seen.insert(node.pubkey.clone()))
        .collect()
}

fn stat_field(raw: &Value, field: &str) -> u64 {
    raw.get(field).and_then(as_counter).unwrap_or(0)
}

/// Read a `get-stats` result. Missing numeric fields read as 0.
pub fn stats_from_value(raw: &Value) -> Option<NodeStats> {
    if !raw.is_object() {
        return None;
    }
    Some(NodeStats {
        ram_used: stat_field(raw, "ram_used"),
        ram_total: stat_field(raw, "ram_total"),
        storage_used: stat_field(raw, "storage_used"),
        storage_committed: stat_field(raw, "storage_committed"),
    })
}

/// Discovery, lookup and per-node stats over the shared caches
pub struct PnodeService {
    network: NetworkConfig,
    caches: CacheContext,
    clients: Arc<dyn PodClientFactory>,
    primary: Option<Arc<dyn PodClient>>,
    enricher: Enricher,
    enrich_concurrency: usize,
}

impl PnodeService {
    pub fn new(
        network: NetworkConfig,
        caches: CacheContext,
        clients: Arc<dyn PodClientFactory>,
        enricher: Enricher,
        enrich_concurrency: usize,
    ) -> Self {
        let primary = network
            .primary_seed()
            .map(|seed| clients.connect(seed, network.primary_timeout()));

        if primary.is_none() {
            warn!("No seeds configured; discovery will always be empty");
        }

        Self {
            network,
            caches,
            clients,
            primary,
            enricher,
            enrich_concurrency,
        }
    }

    pub fn online_threshold_secs(&self) -> u64 {
        self.network.online_threshold_secs
    }

    pub fn caches(&self) -> &CacheContext {
        &self.caches
    }

    /// Run steps 1-3 of a discovery cycle. Never fails; may be empty.
    pub async fn discover(&self) -> Vec<Node> {
        let threshold = self.network.online_threshold_secs;

        if let Some(primary) = &self.primary {
            let pods = match primary.get_pods_with_stats().await {
                Ok(pods) => Ok(pods),
                Err(e) => {
                    debug!(error = %e, "get-pods-with-stats failed, retrying with get-pods");
                    primary.get_pods().await
                }
            };

            match pods {
                Ok(pods) => {
                    let nodes = normalize_all(&pods, Utc::now(), threshold);
                    if !nodes.is_empty() {
                        return nodes;
                    }
                    warn!(records = pods.len(), "Primary seed returned no usable nodes");
                }
                Err(e) => warn!(error = %e, "Primary seed failed, trying fallback seeds"),
            }
        }

        for seed in self.network.fallback_seeds() {
            let client = self.clients.connect(seed, self.network.fallback_timeout());
            match client.get_pods().await {
                Ok(pods) => {
                    let nodes = normalize_all(&pods, Utc::now(), threshold);
                    if !nodes.is_empty() {
                        info!(seed = %seed, count = nodes.len(), "Discovered nodes via fallback seed");
                        return nodes;
                    }
                    debug!(seed = %seed, "Fallback seed returned no usable nodes");
                }
                Err(e) => debug!(seed = %seed, error = %e, "Fallback seed failed"),
            }
        }

        warn!("All seeds exhausted, no nodes discovered");
        Vec::new()
    }

    /// The current node list, from cache or a fresh discovery cycle
    pub async fn get_all_nodes(&self) -> Arc<Vec<Node>> {
        if let Some(cached) = self.caches.nodes.get(NODE_CACHE_KEY) {
            debug!(count = cached.len(), "Using cached pNodes");
            return cached;
        }

        info!("Discovering pNodes (cache miss)");
        let discovered = self.discover().await;
        let found = discovered.len();

        let unique = dedupe_by_pubkey(discovered);
        let online = unique.iter().filter(|n| n.is_online()).count();
        info!(
            found,
            unique = unique.len(),
            online,
            offline = unique.len() - online,
            "Deduplicated discovered nodes"
        );

        let enriched = self
            .enricher
            .enrich_many(unique, Some(self.enrich_concurrency))
            .await;
        let located = enriched.iter().filter(|n| n.has_geo()).count();
        info!(count = enriched.len(), located, "Geographic enrichment complete");

        let nodes = Arc::new(enriched);
        self.caches.nodes.set(NODE_CACHE_KEY, nodes.clone(), None);
        nodes
    }

    /// Drop the cached list and run a full cycle inline
    pub async fn refresh(&self) -> Arc<Vec<Node>> {
        self.caches.nodes.delete(NODE_CACHE_KEY);
        self.get_all_nodes().await
    }

    pub async fn get_node_by_pubkey(&self, pubkey: &str) -> Option<Node> {
        self.get_all_nodes()
            .await
            .iter()
            .find(|node| node.pubkey == pubkey)
            .cloned()
    }

    /// Look up by short display id (`node-xxxxxxxx`)
    pub async fn get_node_by_id(&self, id: &str) -> Option<Node> {
        self.get_all_nodes()
            .await
            .iter()
            .find(|node| node.id == id)
            .cloned()
    }

    /// Live stats straight from the node itself.
    ///
    /// Only online nodes with an address are queried. Failures yield `None`.
    pub async fn get_node_stats(&self, pubkey: &str) -> Option<NodeStats> {
        let key = node_stats_cache_key(pubkey);
        if let Some(stats) = self.caches.stats.get(&key) {
            return Some(stats);
        }

        let node = self.get_node_by_pubkey(pubkey).await?;
        if !node.is_online() {
            return None;
        }

        let address = if node.address.is_empty() {
            node.ip.as_str()
        } else {
            node.address.as_str()
        };
        let host = address_host(address);
        if host.is_empty() {
            return None;
        }

        let client = self.clients.connect(host, self.network.stats_timeout());
        let raw = match client.get_stats().await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(pubkey, host, error = %e, "get-stats failed");
                return None;
            }
        };

        let stats = stats_from_value(&raw)?;
        self.caches.stats.set(&key, stats, None);
        Some(stats)
    }

    /// Node with RAM fields filled in when live stats are available
    pub async fn get_node_with_stats(&self, pubkey: &str) -> Option<Node> {
        let node = self.get_node_by_pubkey(pubkey).await?;
        Some(match self.get_node_stats(pubkey).await {
            Some(stats) => node.with_stats(&stats),
            None => node,
        })
    }

    /// Raw pod records from the primary seed, cached in the analytics namespace.
    ///
    /// Unlike discovery, a failure of both calls is returned to the caller.
    pub async fn get_raw_pods_for_analytics(&self) -> Result<Arc<Vec<Pod>>, DiscoveryError> {
        if let Some(AnalyticsEntry::RawPods(pods)) = self.caches.analytics.get(RAW_PODS_CACHE_KEY) {
            return Ok(pods);
        }

        let primary = self.primary.as_ref().ok_or(DiscoveryError::NoSeeds)?;
        let pods = match primary.get_pods_with_stats().await {
            Ok(pods) => pods,
            Err(e) => {
                debug!(error = %e, "get-pods-with-stats failed, retrying with get-pods");
                primary.get_pods().await?
            }
        };

        let pods = Arc::new(pods);
        self.caches
            .analytics
            .set(RAW_PODS_CACHE_KEY, AnalyticsEntry::RawPods(pods.clone()), None);
        Ok(pods)
    }
}
