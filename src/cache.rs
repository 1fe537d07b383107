//! TTL cache namespaces
//!
//! Four independent stores partition the cache by data volatility:
//!
//! - **nodes**: discovered node list (30s, 10s in production mode)
//! - **stats**: per-node live stats (120s)
//! - **analytics**: raw pods and computed metrics (60s)
//! - **geo**: IP geolocation (24h)
//!
//! Each store is a DashMap keyed by string with a per-entry deadline.
//! Expired entries are evicted lazily on read and by a periodic sweep.
//! Values are shared, not copied: producers must treat a value as frozen
//! once it has been `set`, which is why list values are wrapped in `Arc`.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::CacheConfig;
use crate::models::{GeoLocation, Node, NodeMetrics, NodeStats, Pod};

/// Hit/miss counters for one store
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub keys: usize,
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
}

impl CacheStats {
    /// Calculate hit rate as percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Deadline used when `now + ttl` is not representable
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Key/value store with a default TTL and per-entry override
pub struct CacheStore<V> {
    name: &'static str,
    default_ttl: Duration,
    entries: DashMap<String, CacheEntry<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
}

impl<V: Clone + Send + Sync + 'static> CacheStore<V> {
    pub fn new(name: &'static str, default_ttl: Duration) -> Self {
        Self {
            name,
            default_ttl,
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Get a live value. An expired entry is removed and reads as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            drop(entry);
            if self
                .entries
                .remove_if(key, |_, e| !e.is_live(now))
                .is_some()
            {
                self.expirations.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a value, using the store default when `ttl` is `None`
    pub fn set(&self, key: &str, value: V, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        debug!(cache = self.name, key = key, ttl_secs = ttl.as_secs(), "Cache set");
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).unwrap_or(now + FAR_FUTURE);
        self.entries.insert(key.to_string(), CacheEntry { value, expires_at });
    }

    /// Remove a key, returning how many entries were deleted
    pub fn delete(&self, key: &str) -> usize {
        usize::from(self.entries.remove(key).is_some())
    }

    pub fn flush(&self) {
        self.entries.clear();
    }

    /// Keys of all live entries
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|e| e.value().is_live(now))
            .map(|e| e.key().clone())
            .collect()
    }

    /// Drop every expired entry. Returns the number removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.is_live(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            self.expirations.fetch_add(removed as u64, Ordering::Relaxed);
            debug!(cache = self.name, removed, "Swept expired entries");
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            keys: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}

/// Values held in the analytics namespace
#[derive(Debug, Clone)]
pub enum AnalyticsEntry {
    RawPods(Arc<Vec<Pod>>),
    NodeMetrics(Arc<Vec<NodeMetrics>>),
}

/// The four process-wide cache namespaces
#[derive(Clone)]
pub struct CacheContext {
    pub nodes: Arc<CacheStore<Arc<Vec<Node>>>>,
    pub stats: Arc<CacheStore<NodeStats>>,
    pub analytics: Arc<CacheStore<AnalyticsEntry>>,
    pub geo: Arc<CacheStore<GeoLocation>>,
}

/// Snapshot of all namespace counters
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheContextStats {
    pub nodes: CacheStats,
    pub stats: CacheStats,
    pub analytics: CacheStats,
    pub geo: CacheStats,
}

impl CacheContext {
    pub fn new(config: &CacheConfig) -> Self {
        let node_ttl = Duration::from_secs(config.node_list_ttl_secs());
        info!(
            node_ttl_secs = node_ttl.as_secs(),
            stats_ttl_secs = config.stats_ttl_secs,
            analytics_ttl_secs = config.analytics_ttl_secs,
            geo_ttl_secs = config.geo_ttl_secs,
            mode = ?config.mode,
            "Cache namespaces initialized"
        );

        Self {
            nodes: Arc::new(CacheStore::new("nodes", node_ttl)),
            stats: Arc::new(CacheStore::new(
                "stats",
                Duration::from_secs(config.stats_ttl_secs),
            )),
            analytics: Arc::new(CacheStore::new(
                "analytics",
                Duration::from_secs(config.analytics_ttl_secs),
            )),
            geo: Arc::new(CacheStore::new(
                "geo",
                Duration::from_secs(config.geo_ttl_secs),
            )),
        }
    }

    pub fn sweep_expired(&self) -> usize {
        self.nodes.sweep_expired()
            + self.stats.sweep_expired()
            + self.analytics.sweep_expired()
            + self.geo.sweep_expired()
    }

    pub fn stats(&self) -> CacheContextStats {
        CacheContextStats {
            nodes: self.nodes.stats(),
            stats: self.stats.stats(),
            analytics: self.analytics.stats(),
            geo: self.geo.stats(),
        }
    }

    /// Run `sweep_expired` on a fixed interval until the task is aborted
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let caches = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let removed = caches.sweep_expired();
                if removed > 0 {
                    debug!(removed, stats = ?caches.stats(), "Cache sweep");
                }
            }
        })
    }
}
