//! Shared helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use esarrow_rs::error::TransportError;
use esarrow_rs::transport::{OutboundRequest, RawResponse, Transport};
use serde_json::{json, Value as JsonValue};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// In-memory transport that replays scripted responses in order and records
/// every request it receives.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a response with status 200.
    pub fn ok(self: &Arc<Self>, body: JsonValue) -> Arc<Self> {
        self.respond(200, body)
    }

    /// Queue a response with an arbitrary status.
    pub fn respond(self: &Arc<Self>, status: u16, body: JsonValue) -> Arc<Self> {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(RawResponse::new(status, body)));
        Arc::clone(self)
    }

    /// Queue a transport failure.
    pub fn fail(self: &Arc<Self>, error: TransportError) -> Arc<Self> {
        self.responses.lock().unwrap().push_back(Err(error));
        Arc::clone(self)
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests received for `path`.
    pub fn requests_to(&self, path: &str) -> Vec<OutboundRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<RawResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("no scripted response".to_string())))
    }
}

/// Standard-dialect page of single-column `long` rows.
pub fn standard_page(values: &[i64], cursor: Option<&str>) -> JsonValue {
    let rows: Vec<JsonValue> = values.iter().map(|v| json!([v])).collect();
    match cursor {
        Some(token) => json!({"rows": rows, "cursor": token}),
        None => json!({"rows": rows}),
    }
}

/// Standard-dialect first page of single-column `long` rows.
pub fn standard_first_page(values: &[i64], cursor: Option<&str>) -> JsonValue {
    let mut page = standard_page(values, cursor);
    page["columns"] = json!([{"name": "n", "type": "long"}]);
    page
}
