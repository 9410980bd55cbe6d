//! HTTP transport for the cluster's SQL endpoint.
//!
//! Requests are JSON POSTs to `<base_url>/<path>`. Basic credentials are
//! attached when configured. Response bodies are parsed as JSON when possible;
//! otherwise the raw text is kept so error diagnostics survive.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use super::{OutboundRequest, RawResponse, Transport};
use crate::connection::ConnectionParams;
use crate::error::TransportError;

/// reqwest-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    basic_auth: Option<(String, String)>,
    timeout_ms: u64,
}

impl HttpTransport {
    /// Build a transport from connection parameters.
    ///
    /// # Errors
    /// Returns `TransportError::Client` if the HTTP client cannot be created.
    pub fn new(params: &ConnectionParams) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(params.request_timeout())
            .danger_accept_invalid_certs(params.use_tls && !params.validate_server_certificate)
            .build()
            .map_err(|e| TransportError::Client(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: params.base_url(),
            basic_auth: params
                .basic_auth()
                .map(|(user, password)| (user.to_string(), password.to_string())),
            timeout_ms: params.request_timeout_ms,
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn map_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                timeout_ms: self.timeout_ms,
            }
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<RawResponse, TransportError> {
        let url = self.url_for(&request.path);
        debug!(url = %url, "POST");

        let mut builder = self.client.post(&url).json(&request.body);
        if let Some((user, password)) = &self.basic_auth {
            builder = builder.basic_auth(user, Some(password));
        }

        let response = builder.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        trace!(status, bytes = text.len(), "response received");

        let body = serde_json::from_str::<JsonValue>(&text).unwrap_or(JsonValue::String(text));
        Ok(RawResponse::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionBuilder;

    #[test]
    fn test_url_building() {
        let params = ConnectionBuilder::new()
            .host("es.local")
            .port(9201)
            .path_prefix("proxy")
            .build()
            .unwrap();
        let transport = HttpTransport::new(&params).unwrap();

        assert_eq!(transport.base_url(), "http://es.local:9201/proxy");
        assert_eq!(transport.url_for("_sql"), "http://es.local:9201/proxy/_sql");
        assert_eq!(
            transport.url_for("/_sql/close"),
            "http://es.local:9201/proxy/_sql/close"
        );
    }

    #[test]
    fn test_basic_auth_only_with_both_parts() {
        let params = ConnectionBuilder::new().username("elastic").build().unwrap();
        let transport = HttpTransport::new(&params).unwrap();
        assert!(transport.basic_auth.is_none());

        let params = ConnectionBuilder::new()
            .username("elastic")
            .password("pw")
            .build()
            .unwrap();
        let transport = HttpTransport::new(&params).unwrap();
        assert_eq!(
            transport.basic_auth,
            Some(("elastic".to_string(), "pw".to_string()))
        );
    }
}
