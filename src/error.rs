//! Error types
//!
//! Only the RPC and API errors ever cross a module boundary. Geo and
//! per-node stats failures are folded into `None` by their callers.

use thiserror::Error;

/// Errors talking to a pNode over pRPC
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid response: {0}")]
    Decode(String),
}

/// Reasons a raw pod record cannot become a [`crate::models::Node`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("Pod record has no pubkey")]
    MissingPubkey,

    #[error("Pod last_seen_timestamp out of range: {0}")]
    InvalidTimestamp(i64),
}

/// Geo lookup failures. Never surfaced past the resolver.
#[derive(Debug, Clone, Error)]
pub enum GeoError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Invalid response: {0}")]
    Decode(String),
}

/// Failures of the discovery layer that analytics cannot recover from
#[derive(Debug, Clone, Error)]
pub enum DiscoveryError {
    #[error("Failed to fetch raw pods: {0}")]
    RawPods(#[from] RpcError),

    #[error("No seed endpoints configured")]
    NoSeeds,
}

/// Failures loading the TOML config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
