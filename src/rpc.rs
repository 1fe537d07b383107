//! pRPC client
//!
//! pNodes expose JSON-RPC 2.0 over HTTP POST at `http://{host}:{port}/rpc`.
//! Discovery only needs three methods, so the client is a small trait that
//! tests replace with in-memory fakes.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::RpcError;
use crate::models::Pod;

pub const METHOD_GET_PODS: &str = "get-pods";
pub const METHOD_GET_PODS_WITH_STATS: &str = "get-pods-with-stats";
pub const METHOD_GET_STATS: &str = "get-stats";

/// Client bound to a single pNode host
#[async_trait]
pub trait PodClient: Send + Sync {
    /// Pods known to this host via gossip
    async fn get_pods(&self) -> Result<Vec<Pod>, RpcError>;

    /// Same as `get_pods` with storage and uptime fields populated
    async fn get_pods_with_stats(&self) -> Result<Vec<Pod>, RpcError>;

    /// This host's own live stats as a loose JSON object
    async fn get_stats(&self) -> Result<Value, RpcError>;
}

/// Creates clients for arbitrary hosts (seed fallback, per-node stats)
pub trait PodClientFactory: Send + Sync {
    fn connect(&self, host: &str, timeout: Duration) -> Arc<dyn PodClient>;
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Unwrap a JSON-RPC response body into its `result`
pub(crate) fn parse_envelope(body: Value) -> Result<Value, RpcError> {
    let envelope: RpcEnvelope =
        serde_json::from_value(body).map_err(|e| RpcError::Decode(e.to_string()))?;

    if let Some(err) = envelope.error {
        return Err(RpcError::Rpc {
            code: err.code,
            message: err.message,
        });
    }

    envelope
        .result
        .ok_or_else(|| RpcError::Decode("response has neither result nor error".to_string()))
}

/// Decode `result.pods`, skipping individual records that do not fit [`Pod`]
pub(crate) fn decode_pods(result: &Value) -> Result<Vec<Pod>, RpcError> {
    let records = result
        .get("pods")
        .and_then(Value::as_array)
        .ok_or_else(|| RpcError::Decode("result.pods is not an array".to_string()))?;

    let mut pods = Vec::with_capacity(records.len());
    for record in records {
        match Pod::deserialize(record) {
            Ok(pod) => pods.push(pod),
            Err(e) => debug!(error = %e, "Skipping malformed pod record"),
        }
    }
    Ok(pods)
}

/// JSON-RPC client over reqwest
pub struct HttpPodClient {
    url: String,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl HttpPodClient {
    pub fn new(http_client: reqwest::Client, url: String, timeout: Duration) -> Self {
        Self {
            url,
            timeout,
            http_client,
        }
    }

    async fn call(&self, method: &str) -> Result<Value, RpcError> {
        let request = json!({
            "jsonrpc": "2.0",
            "method": method,
            "id": 1,
        });

        debug!(url = %self.url, method, "pRPC call");

        let response = self
            .http_client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| self.transport_error(e))?;

        parse_envelope(body)
    }

    fn transport_error(&self, e: reqwest::Error) -> RpcError {
        if e.is_timeout() {
            RpcError::Timeout(self.timeout.as_secs())
        } else if e.is_decode() {
            RpcError::Decode(e.to_string())
        } else {
            RpcError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl PodClient for HttpPodClient {
    async fn get_pods(&self) -> Result<Vec<Pod>, RpcError> {
        let result = self.call(METHOD_GET_PODS).await?;
        decode_pods(&result)
    }

    async fn get_pods_with_stats(&self) -> Result<Vec<Pod>, RpcError> {
        let result = self.call(METHOD_GET_PODS_WITH_STATS).await?;
        decode_pods(&result)
    }

    async fn get_stats(&self) -> Result<Value, RpcError> {
        self.call(METHOD_GET_STATS).await
    }
}

/// Builds [`HttpPodClient`]s sharing one connection pool
pub struct HttpPodClientFactory {
    rpc_port: u16,
    rpc_path: String,
    http_client: reqwest::Client,
}

impl HttpPodClientFactory {
    pub fn new(rpc_port: u16, rpc_path: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("pnode-monitor/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            rpc_port,
            rpc_path: rpc_path.into(),
            http_client,
        }
    }

    pub fn endpoint(&self, host: &str) -> String {
        format!("http://{}:{}{}", host, self.rpc_port, self.rpc_path)
    }
}

impl PodClientFactory for HttpPodClientFactory {
    fn connect(&self, host: &str, timeout: Duration) -> Arc<dyn PodClient> {
        Arc::new(HttpPodClient::new(
            self.http_client.clone(),
            self.endpoint(host),
            timeout,
        ))
    }
}
