//! Transport layer between the cursor engine and the cluster.
//!
//! The engine only needs one operation: POST a JSON body to a path below the
//! cluster's base URL and get the status and body back. [`HttpTransport`] does
//! that over HTTP(S); tests and embedders can supply their own [`Transport`].
//!
//! Retries, backoff, request signing and cancellation of in-flight requests all
//! belong to the transport. The engine never retries.

pub mod http_transport;

pub use http_transport::HttpTransport;

use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// One outbound request. Always sent as a POST with a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    /// Path below the base URL, without a leading slash
    pub path: String,
    /// JSON request body
    pub body: JsonValue,
}

impl OutboundRequest {
    /// Create a request for `path` carrying `body`.
    pub fn new(path: impl Into<String>, body: JsonValue) -> Self {
        Self {
            path: path.into(),
            body,
        }
    }
}

/// A raw response as returned by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Parsed JSON body; bodies that are not JSON are carried as `Value::String`
    pub body: JsonValue,
}

impl RawResponse {
    /// Create a response.
    pub fn new(status: u16, body: JsonValue) -> Self {
        Self { status, body }
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to the cluster's SQL endpoint.
///
/// Implementations must be shareable across cursors; each cursor holds an
/// `Arc<dyn Transport>` and calls `send` sequentially.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and wait for the full response.
    ///
    /// # Errors
    /// Returns `TransportError` for network-level failures. Non-2xx statuses
    /// are not errors at this layer.
    async fn send(&self, request: &OutboundRequest) -> Result<RawResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_range() {
        assert!(RawResponse::new(200, json!({})).is_success());
        assert!(RawResponse::new(204, JsonValue::Null).is_success());
        assert!(!RawResponse::new(400, json!({})).is_success());
        assert!(!RawResponse::new(503, json!({})).is_success());
    }
}
