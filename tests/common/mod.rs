//! In-memory pRPC network and geo service for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pnode_monitor::config::Config;
use pnode_monitor::error::{GeoError, RpcError};
use pnode_monitor::geo::GeoProvider;
use pnode_monitor::models::{GeoLocation, Pod};
use pnode_monitor::rpc::{PodClient, PodClientFactory};
use pnode_monitor::AppState;

/// Canned answers for one host. `None` makes the call fail.
#[derive(Clone, Default)]
pub struct FakeHost {
    pub pods_with_stats: Option<Vec<Pod>>,
    pub pods: Option<Vec<Pod>>,
    pub stats: Option<Value>,
}

impl FakeHost {
    pub fn serving(pods: Vec<Pod>) -> Self {
        Self {
            pods_with_stats: Some(pods.clone()),
            pods: Some(pods),
            stats: None,
        }
    }
}

/// Hosts keyed by name, with a log of every call made
#[derive(Default)]
pub struct FakeNetwork {
    hosts: Mutex<HashMap<String, FakeHost>>,
    calls: Mutex<Vec<String>>,
    connects: Mutex<Vec<(String, Duration)>>,
}

impl FakeNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_host(&self, host: &str, fake: FakeHost) {
        self.hosts.lock().unwrap().insert(host.to_string(), fake);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn connects(&self) -> Vec<(String, Duration)> {
        self.connects.lock().unwrap().clone()
    }

    fn host(&self, host: &str, method: &str) -> Option<FakeHost> {
        self.calls.lock().unwrap().push(format!("{}:{}", host, method));
        self.hosts.lock().unwrap().get(host).cloned()
    }
}

struct FakeClient {
    host: String,
    network: Arc<FakeNetwork>,
}

fn unreachable_host(host: &str) -> RpcError {
    RpcError::Network(format!("{} unreachable", host))
}

#[async_trait]
impl PodClient for FakeClient {
    async fn get_pods(&self) -> Result<Vec<Pod>, RpcError> {
        self.network
            .host(&self.host, "get-pods")
            .and_then(|h| h.pods)
            .ok_or_else(|| unreachable_host(&self.host))
    }

    async fn get_pods_with_stats(&self) -> Result<Vec<Pod>, RpcError> {
        self.network
            .host(&self.host, "get-pods-with-stats")
            .and_then(|h| h.pods_with_stats)
            .ok_or_else(|| unreachable_host(&self.host))
    }

    async fn get_stats(&self) -> Result<Value, RpcError> {
        self.network
            .host(&self.host, "get-stats")
            .and_then(|h| h.stats)
            .ok_or_else(|| unreachable_host(&self.host))
    }
}

pub struct FakeFactory(pub Arc<FakeNetwork>);

impl PodClientFactory for FakeFactory {
    fn connect(&self, host: &str, timeout: Duration) -> Arc<dyn PodClient> {
        self.0
            .connects
            .lock()
            .unwrap()
            .push((host.to_string(), timeout));
        Arc::new(FakeClient {
            host: host.to_string(),
            network: self.0.clone(),
        })
    }
}

/// Geo service that knows a fixed set of IPs
#[derive(Default)]
pub struct FakeGeo {
    locations: Mutex<HashMap<String, GeoLocation>>,
    lookups: Mutex<Vec<String>>,
}

impl FakeGeo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn locate(&self, ip: &str, geo: GeoLocation) {
        self.locations.lock().unwrap().insert(ip.to_string(), geo);
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl GeoProvider for FakeGeo {
    async fn lookup(&self, ip: &str) -> Result<Option<GeoLocation>, GeoError> {
        self.lookups.lock().unwrap().push(ip.to_string());
        Ok(self.locations.lock().unwrap().get(ip).cloned())
    }
}

pub fn brazil() -> GeoLocation {
    GeoLocation {
        lat: -23.5505,
        lng: -46.6333,
        country: "Brazil".to_string(),
        region: "Sao Paulo".to_string(),
        city: Some("Sao Paulo".to_string()),
    }
}

/// Pod seen `age_secs` ago at `ip:9001`
pub fn pod(pubkey: &str, ip: &str, age_secs: i64) -> Pod {
    Pod {
        pubkey: Some(pubkey.to_string()),
        address: Some(format!("{}:9001", ip)),
        last_seen_timestamp: Utc::now().timestamp() - age_secs,
        uptime: Some(86_400),
        version: Some("0.8.0".to_string()),
        storage_used: Some(10 * 1024 * 1024 * 1024),
        storage_committed: Some(100 * 1024 * 1024 * 1024),
        ..Default::default()
    }
}

/// Config pointing at `seeds`, everything else default
pub fn config_with_seeds(seeds: &[&str]) -> Config {
    let mut config = Config::default();
    config.network.seeds = seeds.iter().map(|s| s.to_string()).collect();
    config
}

pub fn app_state(config: &Config, network: &Arc<FakeNetwork>, geo: &Arc<FakeGeo>) -> AppState {
    AppState::new(
        config,
        Arc::new(FakeFactory(network.clone())),
        geo.clone(),
    )
}
