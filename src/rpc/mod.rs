/// RPC Client Module
///
/// JSON-RPC client for the node's P-Chain block index
/// (`/ext/index/P/block`). Container bytes come back as checksummed hex and
/// are verified and decoded here.
use crate::codec::formatting::{decode_hex_checksum, FormattingError};
use crate::etl::extract::ContainerSource;
use crate::models::Container;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

const INDEX_PATH: &str = "/ext/index/P/block";

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
    #[error("{method} request failed: {source}")]
    Request { method: &'static str, source: reqwest::Error },
    #[error("{method} HTTP {status}: {body}")]
    Status { method: &'static str, status: reqwest::StatusCode, body: String },
    #[error("{method} error {code}: {message}")]
    Remote { method: &'static str, code: i64, message: String },
    #[error("{method} invalid response: {reason}")]
    InvalidResponse { method: &'static str, reason: String },
    #[error("container {index} has invalid bytes: {source}")]
    ContainerBytes { index: String, source: FormattingError },
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct ContainerRange {
    containers: Vec<FormattedContainer>,
}

#[derive(Debug, Deserialize)]
struct FormattedContainer {
    id: String,
    bytes: String,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    encoding: Option<String>,
    index: String,
}

impl FormattedContainer {
    fn into_container(self) -> Result<Container, RpcError> {
        const METHOD: &str = "index.getContainerRange";

        if let Some(encoding) = self.encoding.as_deref() {
            if encoding != "hex" {
                return Err(RpcError::InvalidResponse {
                    method: METHOD,
                    reason: format!("unexpected encoding {}", encoding),
                });
            }
        }

        let index = self.index.parse::<u64>().map_err(|_| RpcError::InvalidResponse {
            method: METHOD,
            reason: format!("non-numeric container index {:?}", self.index),
        })?;
        let bytes = decode_hex_checksum(&self.bytes)
            .map_err(|source| RpcError::ContainerBytes { index: self.index.clone(), source })?;

        Ok(Container { id: self.id, bytes, timestamp: self.timestamp, index })
    }
}

pub struct IndexClient {
    client: reqwest::Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl IndexClient {
    /// Create a client for the P-Chain block index of the node at `node_url`
    pub fn new(node_url: &str, timeout: Duration) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder().timeout(timeout).build().map_err(RpcError::Client)?;
        let endpoint = format!("{}{}", node_url.trim_end_matches('/'), INDEX_PATH);

        Ok(Self { client, endpoint, next_id: AtomicU64::new(1) })
    }

    /// Get the endpoint URL this client posts to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call(&self, method: &'static str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|source| RpcError::Request { method, source })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| RpcError::Request { method, source })?;
        if !status.is_success() {
            return Err(RpcError::Status { method, status, body });
        }

        parse_response(method, &body)
    }

    /// Fetch containers `[start, start + count)` with hex encoding
    pub async fn get_container_range(&self, start: u64, count: u64) -> Result<Vec<Container>, RpcError> {
        const METHOD: &str = "index.getContainerRange";

        tracing::debug!("Requesting {} containers from index {}", count, start);
        let params = json!({
            "startIndex": start.to_string(),
            "numToFetch": count.to_string(),
            "encoding": "hex",
        });

        let result = self.call(METHOD, params).await?;
        parse_container_range(result)
    }
}

fn parse_response(method: &'static str, body: &str) -> Result<Value, RpcError> {
    let response: RpcResponse<Value> = serde_json::from_str(body)
        .map_err(|e| RpcError::InvalidResponse { method, reason: e.to_string() })?;

    if let Some(err) = response.error {
        return Err(RpcError::Remote { method, code: err.code, message: err.message });
    }

    response.result.ok_or_else(|| RpcError::InvalidResponse { method, reason: "missing result".to_string() })
}

fn parse_container_range(result: Value) -> Result<Vec<Container>, RpcError> {
    let range: ContainerRange = serde_json::from_value(result)
        .map_err(|e| RpcError::InvalidResponse { method: "index.getContainerRange", reason: e.to_string() })?;

    range.containers.into_iter().map(FormattedContainer::into_container).collect()
}

#[async_trait]
impl ContainerSource for IndexClient {
    async fn get_container_range(&self, start: u64, count: u64) -> anyhow::Result<Vec<Container>> {
        Ok(IndexClient::get_container_range(self, start, count).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::formatting::encode_hex_checksum;

    fn response_body(containers: Value) -> String {
        json!({ "jsonrpc": "2.0", "id": 1, "result": { "containers": containers } }).to_string()
    }

    #[test]
    fn test_endpoint_joins_index_path() {
        let client = IndexClient::new("http://localhost:9650/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:9650/ext/index/P/block");
    }

    #[test]
    fn test_parse_container_range() {
        let body = response_body(json!([
            {
                "id": "2oJ9RBeG4b5jC3Ad1FuUSAVc4Bsa3ThUDGJwYBkVEzggHTSY8W",
                "bytes": encode_hex_checksum(&[0, 0, 0, 0, 0, 2]).unwrap(),
                "timestamp": "2022-10-18T15:58:28.785Z",
                "encoding": "hex",
                "index": "42"
            },
            {
                "id": "2cHt6hBf2YnRbYhM3NwfyLWz6tZd7XbXKmzHX9NZyyKmyqBtkz",
                "bytes": "0x7852b855",
                "timestamp": "2022-10-18T15:58:29Z",
                "encoding": "hex",
                "index": "43"
            }
        ]));

        let result = parse_response("index.getContainerRange", &body).unwrap();
        let containers = parse_container_range(result).unwrap();

        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].index, 42);
        assert_eq!(containers[0].bytes, vec![0, 0, 0, 0, 0, 2]);
        assert_eq!(containers[0].timestamp.unwrap().timestamp(), 1_666_108_708);
        assert!(containers[1].bytes.is_empty());
    }

    #[test]
    fn test_bad_checksum_is_rejected() {
        let body = response_body(json!([
            { "id": "x", "bytes": "0x00000000", "encoding": "hex", "index": "1" }
        ]));

        let result = parse_response("index.getContainerRange", &body).unwrap();
        assert!(matches!(parse_container_range(result), Err(RpcError::ContainerBytes { .. })));
    }

    #[test]
    fn test_json_rpc_error_is_surfaced() {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32000, "message": "start index (9999999) > last accepted index (100)" }
        })
        .to_string();

        let err = parse_response("index.getContainerRange", &body).unwrap_err();
        assert!(matches!(err, RpcError::Remote { code: -32000, .. }));
        assert!(err.to_string().contains("last accepted index"));
    }

    #[test]
    fn test_garbage_body_is_invalid_response() {
        assert!(matches!(
            parse_response("index.getContainerRange", "<html>"),
            Err(RpcError::InvalidResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_node_is_a_request_error() {
        let client = IndexClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        assert!(matches!(client.get_container_range(0, 1).await, Err(RpcError::Request { .. })));
    }
}
