//! Pod normalization and derived-metric formulas
//!
//! Everything here is pure: the caller supplies `now` so the online
//! cutoff can be tested without a clock.

use chrono::{DateTime, Utc};

use crate::error::NormalizeError;
use crate::models::{NetworkHealth, Node, NodeStatus, Pod, Tier, UNKNOWN_LOCATION};

pub const SECONDS_IN_24H: f64 = 86_400.0;
pub const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;
pub const BYTES_PER_TB: f64 = 1024.0 * 1024.0 * 1024.0 * 1024.0;

const UPTIME_WEIGHT: f64 = 0.5;
const STORAGE_HEADROOM_WEIGHT: f64 = 0.3;
const ONLINE_WEIGHT: f64 = 0.2;

const PREMIUM_THRESHOLD: f64 = 85.0;
const STANDARD_THRESHOLD: f64 = 70.0;

/// Deterministic display id: `node-` + first 8 chars of the pubkey
pub fn short_node_id(pubkey: &str) -> String {
    if pubkey.is_empty() {
        return "node-unknown".to_string();
    }
    let short: String = pubkey.chars().take(8).collect();
    format!("node-{}", short)
}

/// Host part of an `ip:port` address
pub fn address_host(address: &str) -> &str {
    address.split(':').next().unwrap_or_default().trim()
}

/// True when `last_seen` (unix seconds) is inside the online window
pub fn is_recently_seen(last_seen: i64, now: DateTime<Utc>, threshold_secs: u64) -> bool {
    let threshold = i64::try_from(threshold_secs).unwrap_or(i64::MAX);
    last_seen >= now.timestamp().saturating_sub(threshold)
}

/// Map a raw pod into the canonical node shape.
///
/// Status is recomputed here from `last_seen_timestamp`; geo fields start
/// out as "Unknown" and are filled in by enrichment.
pub fn normalize_pod(
    pod: &Pod,
    now: DateTime<Utc>,
    online_threshold_secs: u64,
) -> Result<Node, NormalizeError> {
    let pubkey = match pod.pubkey.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => key.to_string(),
        _ => return Err(NormalizeError::MissingPubkey),
    };

    let last_seen = DateTime::<Utc>::from_timestamp(pod.last_seen_timestamp, 0)
        .ok_or(NormalizeError::InvalidTimestamp(pod.last_seen_timestamp))?;

    let status = if is_recently_seen(pod.last_seen_timestamp, now, online_threshold_secs) {
        NodeStatus::Online
    } else {
        NodeStatus::Offline
    };

    let uptime_seconds = pod.uptime.unwrap_or(0);
    let storage_used = pod.storage_used.unwrap_or(0);
    let storage_committed = pod.storage_committed.unwrap_or(0);
    let address = pod.address.clone().unwrap_or_default();

    Ok(Node {
        id: short_node_id(&pubkey),
        pubkey,
        status,
        ip: address_host(&address).to_string(),
        address,
        last_seen,
        uptime_seconds,
        uptime: uptime_24h(uptime_seconds),
        version: pod
            .version
            .clone()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "unknown".to_string()),
        storage_used,
        storage_total: storage_committed,
        storage_committed,
        storage_used_gb: round2(storage_used as f64 / BYTES_PER_GB),
        storage_capacity_gb: round2(storage_committed as f64 / BYTES_PER_GB),
        region: UNKNOWN_LOCATION.to_string(),
        country: UNKNOWN_LOCATION.to_string(),
        city: None,
        lat: None,
        lng: None,
        ram_used: None,
        ram_total: None,
    })
}

/// `min(uptime_seconds / 86400 * 100, 100)`
pub fn uptime_24h(uptime_seconds: u64) -> f64 {
    (uptime_seconds as f64 / SECONDS_IN_24H * 100.0).min(100.0)
}

/// Used over total as a percentage rounded to 2 decimals, 0 for no capacity
pub fn utilization(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(used as f64 / total as f64 * 100.0)
}

/// Weighted blend: 50% uptime, 30% storage headroom, 20% online flag
pub fn health_score(uptime_24h: f64, storage_utilization: f64, is_online: bool) -> f64 {
    let uptime_score = uptime_24h * UPTIME_WEIGHT;
    let storage_score = (100.0 - storage_utilization) * STORAGE_HEADROOM_WEIGHT;
    let online_score = if is_online { 100.0 * ONLINE_WEIGHT } else { 0.0 };

    uptime_score + storage_score + online_score
}

pub fn node_tier(health_score: f64) -> Tier {
    if health_score >= PREMIUM_THRESHOLD {
        Tier::Premium
    } else if health_score >= STANDARD_THRESHOLD {
        Tier::Standard
    } else {
        Tier::Basic
    }
}

pub fn network_health(online_percentage: f64) -> NetworkHealth {
    if online_percentage >= 95.0 {
        NetworkHealth::Healthy
    } else if online_percentage >= 85.0 {
        NetworkHealth::Degraded
    } else {
        NetworkHealth::Unstable
    }
}

/// `part / total * 100` rounded to 2 decimals, 0 when `total` is 0
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(part as f64 / total as f64 * 100.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
