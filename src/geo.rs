//! IP geolocation
//!
//! Best-effort: every failure mode (bad address, timeout, transport error,
//! `status: "fail"`, missing coordinates) resolves to `None`. Successful
//! lookups are cached in the geo namespace for 24h.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::cache::CacheStore;
use crate::error::GeoError;
use crate::models::{GeoLocation, UNKNOWN_LOCATION};

const GEO_CACHE_KEY_PREFIX: &str = "geo:";
const IP_API_FIELDS: &str = "status,message,country,regionName,city,lat,lon";

/// External geolocation lookup for one IPv4 address.
///
/// `Ok(None)` means the service answered but has no usable location.
#[async_trait]
pub trait GeoProvider: Send + Sync {
    async fn lookup(&self, ip: &str) -> Result<Option<GeoLocation>, GeoError>;
}

/// Extract the IPv4 part of `ip[:port]`.
///
/// Only the shape is checked (four dot-separated groups of 1-3 digits), so
/// `999.1.1.1` passes and is left for the upstream service to reject.
pub fn extract_ipv4(address: &str) -> Option<&str> {
    let ip = address.split(':').next()?.trim();

    let mut groups = 0;
    for group in ip.split('.') {
        groups += 1;
        if group.is_empty() || group.len() > 3 || !group.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }

    (groups == 4).then_some(ip)
}

pub fn geo_cache_key(ip: &str) -> String {
    format!("{}{}", GEO_CACHE_KEY_PREFIX, ip)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    region_name: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    lat: Option<Value>,
    #[serde(default)]
    lon: Option<Value>,
}

/// Coordinates arrive as numbers or numeric strings. Zero counts as absent.
fn parse_coordinate(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (parsed.is_finite() && parsed != 0.0).then_some(parsed)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn location_from_response(data: IpApiResponse) -> Option<GeoLocation> {
    if data.status.as_deref() == Some("fail") {
        debug!(message = ?data.message, "Geo service reported failure");
        return None;
    }

    let lat = parse_coordinate(data.lat.as_ref())?;
    let lng = parse_coordinate(data.lon.as_ref())?;
    let country = non_empty(data.country)?;

    Some(GeoLocation {
        lat,
        lng,
        country,
        region: non_empty(data.region_name).unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
        city: non_empty(data.city),
    })
}

/// ip-api.com JSON endpoint
pub struct IpApiProvider {
    endpoint: String,
    http_client: reqwest::Client,
}

impl IpApiProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("pnode-monitor/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            http_client,
        }
    }

    fn url(&self, ip: &str) -> String {
        format!("{}/{}?fields={}", self.endpoint, ip, IP_API_FIELDS)
    }
}

#[async_trait]
impl GeoProvider for IpApiProvider {
    async fn lookup(&self, ip: &str) -> Result<Option<GeoLocation>, GeoError> {
        let response = self
            .http_client
            .get(self.url(ip))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| GeoError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeoError::Status(response.status().as_u16()));
        }

        let data: IpApiResponse = response
            .json()
            .await
            .map_err(|e| GeoError::Decode(e.to_string()))?;

        Ok(location_from_response(data))
    }
}

/// Cache-fronted geo lookups with a hard per-call deadline
pub struct GeoResolver {
    provider: Arc<dyn GeoProvider>,
    cache: Arc<CacheStore<GeoLocation>>,
    timeout: Duration,
    node_timeout: Duration,
}

impl GeoResolver {
    pub fn new(
        provider: Arc<dyn GeoProvider>,
        cache: Arc<CacheStore<GeoLocation>>,
        timeout: Duration,
        node_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            cache,
            timeout,
            node_timeout,
        }
    }

    /// Resolve an already-extracted IP. `timeout` defaults to the resolver's own.
    pub async fn resolve_ip(&self, ip: &str, timeout: Option<Duration>) -> Option<GeoLocation> {
        let key = geo_cache_key(ip);
        if let Some(cached) = self.cache.get(&key) {
            return Some(cached);
        }

        let deadline = timeout.unwrap_or(self.timeout);
        let geo = match tokio::time::timeout(deadline, self.provider.lookup(ip)).await {
            Ok(Ok(Some(geo))) => geo,
            Ok(Ok(None)) => {
                debug!(ip, "No geo data");
                return None;
            }
            Ok(Err(e)) => {
                debug!(ip, error = %e, "Geo lookup failed");
                return None;
            }
            Err(_) => {
                debug!(ip, timeout_ms = deadline.as_millis() as u64, "Geo lookup timed out");
                return None;
            }
        };

        self.cache.set(&key, geo.clone(), None);
        Some(geo)
    }

    /// Resolve a node address (`ip[:port]`) with the node timeout
    pub async fn resolve_node(&self, address: &str) -> Option<GeoLocation> {
        let ip = extract_ipv4(address)?;
        self.resolve_ip(ip, Some(self.node_timeout)).await
    }
}
