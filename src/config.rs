//! Service configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub geo: GeoConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Seed hosts. The first entry is the primary endpoint.
    #[serde(default = "default_seeds")]
    pub seeds: Vec<String>,

    /// pRPC port on every pNode
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    #[serde(default = "default_rpc_path")]
    pub rpc_path: String,

    #[serde(default = "default_primary_timeout")]
    pub primary_timeout_secs: u64,

    /// Per-seed timeout while falling back
    #[serde(default = "default_fallback_timeout")]
    pub fallback_timeout_secs: u64,

    /// Timeout for a node's own get-stats call
    #[serde(default = "default_stats_timeout")]
    pub stats_timeout_secs: u64,

    /// A pod seen within this many seconds counts as online
    #[serde(default = "default_online_threshold")]
    pub online_threshold_secs: u64,
}

impl NetworkConfig {
    pub fn primary_seed(&self) -> Option<&str> {
        self.seeds.first().map(String::as_str)
    }

    pub fn fallback_seeds(&self) -> &[String] {
        self.seeds.get(1..).unwrap_or_default()
    }

    pub fn primary_timeout(&self) -> Duration {
        Duration::from_secs(self.primary_timeout_secs)
    }

    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_secs(self.fallback_timeout_secs)
    }

    pub fn stats_timeout(&self) -> Duration {
        Duration::from_secs(self.stats_timeout_secs)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            seeds: default_seeds(),
            rpc_port: default_rpc_port(),
            rpc_path: default_rpc_path(),
            primary_timeout_secs: default_primary_timeout(),
            fallback_timeout_secs: default_fallback_timeout(),
            stats_timeout_secs: default_stats_timeout(),
            online_threshold_secs: default_online_threshold(),
        }
    }
}

/// Runtime mode. Production shortens the node-list TTL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    #[default]
    Development,
    Production,
}

impl std::str::FromStr for RuntimeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown runtime mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub mode: RuntimeMode,

    #[serde(default = "default_node_ttl")]
    pub node_ttl_secs: u64,

    #[serde(default = "default_production_node_ttl")]
    pub production_node_ttl_secs: u64,

    #[serde(default = "default_stats_ttl")]
    pub stats_ttl_secs: u64,

    #[serde(default = "default_analytics_ttl")]
    pub analytics_ttl_secs: u64,

    #[serde(default = "default_geo_ttl")]
    pub geo_ttl_secs: u64,

    /// How often expired entries are swept
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl CacheConfig {
    /// Node-list TTL for the configured mode
    pub fn node_list_ttl_secs(&self) -> u64 {
        match self.mode {
            RuntimeMode::Production => self.production_node_ttl_secs,
            RuntimeMode::Development => self.node_ttl_secs,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            mode: RuntimeMode::default(),
            node_ttl_secs: default_node_ttl(),
            production_node_ttl_secs: default_production_node_ttl(),
            stats_ttl_secs: default_stats_ttl(),
            analytics_ttl_secs: default_analytics_ttl(),
            geo_ttl_secs: default_geo_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    /// Base URL; the IP is appended as a path segment
    #[serde(default = "default_geo_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_geo_timeout")]
    pub timeout_secs: u64,

    /// Timeout used when enriching nodes
    #[serde(default = "default_geo_node_timeout")]
    pub node_timeout_secs: u64,

    /// Batch size for enrichment during discovery
    #[serde(default = "default_discovery_concurrency")]
    pub discovery_concurrency: usize,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            endpoint: default_geo_endpoint(),
            timeout_secs: default_geo_timeout(),
            node_timeout_secs: default_geo_node_timeout(),
            discovery_concurrency: default_discovery_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP API port
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
        }
    }
}

// Defaults
fn default_seeds() -> Vec<String> {
    [
        "173.212.220.65",
        "161.97.97.41",
        "192.190.136.36",
        "192.190.136.38",
        "207.244.255.1",
        "192.190.136.28",
        "192.190.136.29",
        "173.212.203.145",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_rpc_port() -> u16 { 6000 }
fn default_rpc_path() -> String { "/rpc".to_string() }
fn default_primary_timeout() -> u64 { 10 }
fn default_fallback_timeout() -> u64 { 5 }
fn default_stats_timeout() -> u64 { 8 }
fn default_online_threshold() -> u64 { 300 }
fn default_node_ttl() -> u64 { 30 }
fn default_production_node_ttl() -> u64 { 10 }
fn default_stats_ttl() -> u64 { 120 }
fn default_analytics_ttl() -> u64 { 60 }
fn default_geo_ttl() -> u64 { 86_400 }
fn default_sweep_interval() -> u64 { 5 }
fn default_geo_endpoint() -> String { "http://ip-api.com/json".to_string() }
fn default_geo_timeout() -> u64 { 5 }
fn default_geo_node_timeout() -> u64 { 3 }
fn default_discovery_concurrency() -> usize { 20 }
fn default_http_port() -> u16 { 3000 }

impl Config {
    /// Load from a TOML file, or defaults when the file does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.network.seeds.len(), 8);
        assert_eq!(config.network.primary_seed(), Some("173.212.220.65"));
        assert_eq!(config.network.fallback_seeds().len(), 7);
        assert_eq!(config.network.online_threshold_secs, 300);
        assert_eq!(config.network.rpc_port, 6000);
        assert_eq!(config.cache.node_list_ttl_secs(), 30);
        assert_eq!(config.geo.discovery_concurrency, 20);
        assert_eq!(config.api.http_port, 3000);
    }

    #[test]
    fn test_production_mode_shortens_node_ttl() {
        let mut config = CacheConfig::default();
        config.mode = RuntimeMode::Production;
        assert_eq!(config.node_list_ttl_secs(), 10);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
[network]
seeds = ["10.0.0.1"]

[cache]
mode = "production"
"#,
        )
        .unwrap();

        assert_eq!(config.network.seeds, vec!["10.0.0.1".to_string()]);
        assert!(config.network.fallback_seeds().is_empty());
        assert_eq!(config.network.fallback_timeout_secs, 5);
        assert_eq!(config.cache.mode, RuntimeMode::Production);
        assert_eq!(config.cache.geo_ttl_secs, 86_400);
        assert_eq!(config.api.http_port, 3000);
    }
}
